use thiserror::Error;

/// Errors from building or running a query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    InvalidArgument(String),

    #[error("store error: {0}")]
    Store(#[from] kindstore_store::StoreError),
}
