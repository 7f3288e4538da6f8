//! Error types for the onceread core.
//!
//! Layered like the rest of the system: [`ValidationError`] for malformed
//! input, [`StorageError`] for backing-store failures, and [`SecretError`] as
//! the taxonomy reported at the service boundary.
//!
//! Losing the at-most-once race is not a separate error: a caller whose
//! destructive read found nothing cannot tell whether the envelope never
//! existed, expired or was consumed a microsecond earlier, and sees
//! [`SecretError::NotFound`] in all three cases.

use onceread_crypto::DecryptionError;
use thiserror::Error;

use crate::{envelope::EnvelopeId, retrieval::RetrievalError};

/// Malformed input rejected before it reaches the store or the cipher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Text secret is empty or whitespace only
    #[error("message is empty")]
    EmptyMessage,

    /// Text secret exceeds the character limit
    #[error("message is {len} characters, limit is {max}")]
    MessageTooLong {
        /// Characters submitted
        len: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Photo or document submission without file content
    #[error("no file provided")]
    MissingFile,

    /// File exceeds the size limit
    #[error("file is {size} bytes, limit is {max}")]
    FileTooLarge {
        /// Bytes submitted
        size: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Password protection requested with a too-short password
    #[error("password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum length
        min: usize,
    },

    /// Time-to-live is zero or exceeds the maximum
    #[error("time-to-live of {ttl_millis}ms is outside (0, {max_millis}ms]")]
    InvalidTtl {
        /// Requested TTL
        ttl_millis: u64,
        /// Maximum TTL
        max_millis: u64,
    },

    /// Encrypted content is larger than any legitimate sealed payload
    #[error("encrypted content is {len} bytes, limit is {max}")]
    ContentTooLarge {
        /// Submitted length
        len: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Encrypted content is not a structurally valid sealed blob
    #[error("encrypted content is malformed")]
    MalformedContent,

    /// Photo or document metadata without a file name
    #[error("file name is required for {kind} secrets")]
    MissingFileName {
        /// Message type that requires the name
        kind: &'static str,
    },

    /// Unrecognised message type tag
    #[error("unknown message type: {0:?}")]
    UnknownMessageType(String),

    /// Identifier is not a valid envelope id
    #[error("invalid secret id: {0:?}")]
    InvalidId(String),

    /// Share link could not be parsed
    #[error("invalid share link: {0}")]
    InvalidLink(String),

    /// Envelope does not expire strictly after its creation
    #[error("expiry must be after creation")]
    InvalidTimestamps,

    /// Photo submission with a non-image content type
    #[error("photo must have an image/* content type, got {0:?}")]
    NotAnImage(String),
}

/// Errors from the backing store. Never retried by the core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// An envelope with this id is already stored
    #[error("envelope {0} already exists")]
    Conflict(EnvelopeId),

    /// Stored record could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backing-store I/O failure
    #[error("storage I/O error: {0}")]
    Io(String),
}

/// Errors reported at the service boundary.
#[derive(Error, Debug)]
pub enum SecretError {
    /// Input rejected
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Absent, expired, already consumed, or lost the race for it
    #[error("secret not found, expired or already viewed")]
    NotFound,

    /// Secret was fetched (and destroyed) but could not be decrypted
    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    /// Backing store failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Retrieval state machine driven out of order
    #[error(transparent)]
    Protocol(RetrievalError),
}

impl SecretError {
    /// Whether a recipient should see the terminal "unavailable" state.
    ///
    /// Both not-found and decryption failure mean the content is gone for
    /// good; neither offers a retry.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::NotFound | Self::Decryption(_))
    }
}

impl From<RetrievalError> for SecretError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::Storage(err) => Self::Storage(err),
            other @ RetrievalError::InvalidTransition { .. } => Self::Protocol(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::RetrievalStatus;

    #[test]
    fn unavailable_covers_not_found_and_decryption() {
        assert!(SecretError::NotFound.is_unavailable());
        assert!(SecretError::Decryption(DecryptionError).is_unavailable());
        assert!(!SecretError::Validation(ValidationError::EmptyMessage).is_unavailable());
        assert!(!SecretError::Storage(StorageError::Io("disk".into())).is_unavailable());
    }

    #[test]
    fn retrieval_storage_error_maps_to_storage() {
        let err: SecretError = RetrievalError::Storage(StorageError::Io("down".into())).into();
        assert!(matches!(err, SecretError::Storage(StorageError::Io(_))));
    }

    #[test]
    fn retrieval_transition_error_maps_to_protocol() {
        let err: SecretError = RetrievalError::InvalidTransition {
            from: RetrievalStatus::Revealed,
            operation: "lookup",
        }
        .into();
        assert!(matches!(err, SecretError::Protocol(_)));
    }
}
