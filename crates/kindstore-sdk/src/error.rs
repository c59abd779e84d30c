use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("datastore client was used before it was connected")]
    NotInitialized,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] kindstore_store::StoreError),

    #[error("query error: {0}")]
    Query(#[from] kindstore_query::QueryError),
}

impl From<kindstore_types::KeyError> for SdkError {
    fn from(err: kindstore_types::KeyError) -> Self {
        SdkError::InvalidArgument(err.to_string())
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
