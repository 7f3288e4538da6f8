//! Server error types.

use onceread_core::{RetrievalError, SecretError, StorageError, ValidationError};
use thiserror::Error;

/// Errors that can occur in the server and CLI.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error (unparseable base URL, bad expiry, etc.).
    ///
    /// Fatal: fix the arguments and rerun.
    #[error("configuration error: {0}")]
    Config(String),

    /// Local I/O (reading input, writing a revealed file, prompting).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Secret lifecycle error from the service.
    #[error(transparent)]
    Secret(#[from] SecretError),

    /// A blocking task panicked or was cancelled.
    ///
    /// Should never happen in a correct implementation. Indicates a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for ServerError {
    fn from(err: StorageError) -> Self {
        Self::Secret(SecretError::Storage(err))
    }
}

impl From<ValidationError> for ServerError {
    fn from(err: ValidationError) -> Self {
        Self::Secret(SecretError::Validation(err))
    }
}

impl From<RetrievalError> for ServerError {
    fn from(err: RetrievalError) -> Self {
        Self::Secret(err.into())
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(err.to_string())
    }
}
