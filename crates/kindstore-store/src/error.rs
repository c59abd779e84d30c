use std::time::Duration;

use kindstore_types::{Key, KeyError};

/// Errors surfaced by a [`Backend`](crate::Backend) implementation.
///
/// These stand in for the failures a managed backend SDK reports. The store
/// never retries them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// An insert targeted a key that already holds an entity.
    #[error("entity already exists: {0}")]
    AlreadyExists(Key),

    /// An update targeted a key with no entity.
    #[error("no entity to update: {0}")]
    NotFound(Key),

    /// The backend could not be reached or refused the call.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Any other backend-side failure.
    #[error("backend internal error: {0}")]
    Internal(String),
}

/// Result alias for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors from entity store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Malformed key, entity, or query input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// One or more requested keys are absent (strict reads only).
    #[error("{} key(s) not found: {}", .keys.len(), render_keys(.keys))]
    NotFound { keys: Vec<Key> },

    /// The backend acknowledged fewer mutations than were submitted.
    #[error("write conflict: {committed} of {expected} mutations committed")]
    WriteConflict { expected: usize, committed: usize },

    /// The call exceeded its deadline.
    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    /// The call's cancellation token fired.
    #[error("{op} cancelled")]
    Cancelled { op: &'static str },

    /// A failure reported by the backend, message preserved verbatim.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<KeyError> for StoreError {
    fn from(err: KeyError) -> Self {
        StoreError::InvalidArgument(err.to_string())
    }
}

fn render_keys(keys: &[Key]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
