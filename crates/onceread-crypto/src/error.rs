//! Error types for sealing and opening blobs.

use thiserror::Error;

/// Errors that can occur while producing key material or sealing a blob.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// The OS random number generator failed.
    ///
    /// Fatal for the operation: no blob or key is produced from weak entropy.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),
}

impl From<getrandom::Error> for CipherError {
    fn from(err: getrandom::Error) -> Self {
        Self::Entropy(err.to_string())
    }
}

/// A blob could not be opened.
///
/// Deliberately carries no detail. Malformed base64, a truncated blob and a
/// failed authentication tag are indistinguishable to the caller.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("decryption failed")]
pub struct DecryptionError;
