use thiserror::Error;

/// Errors produced while building or decoding identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

/// Result alias for key construction and decoding.
pub type KeyResult<T> = Result<T, KeyError>;
