//! Payload framing: how text and files become sealable bytes and back.
//!
//! Text is sealed as its UTF-8 bytes. Files are base64-encoded to text first,
//! so every sealed payload is printable.

use base64::{Engine, engine::general_purpose::STANDARD};
use onceread_crypto::DecryptionError;
use zeroize::Zeroizing;

use crate::envelope::{DEFAULT_FILE_TYPE, FileKind, Metadata};

/// File name reported for files stored without one.
pub const DEFAULT_FILE_NAME: &str = "file";

/// What a sender wants to share.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretInput {
    /// A text message
    Text(String),
    /// A photo or document
    File {
        /// Photo or document
        kind: FileKind,
        /// Declared file name
        file_name: String,
        /// Declared content type (may be empty)
        file_type: String,
        /// Raw file content
        bytes: Vec<u8>,
    },
}

impl std::fmt::Debug for SecretInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => {
                f.debug_struct("Text").field("chars", &text.chars().count()).finish()
            },
            Self::File { kind, file_name, file_type, bytes } => f
                .debug_struct("File")
                .field("kind", kind)
                .field("file_name", file_name)
                .field("file_type", file_type)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

/// A successfully opened secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealedSecret {
    /// Text message
    Text(Zeroizing<String>),
    /// Reconstructed file
    File {
        /// Photo or document
        kind: FileKind,
        /// Declared file name, or [`DEFAULT_FILE_NAME`]
        file_name: String,
        /// Declared content type, or [`DEFAULT_FILE_TYPE`]
        file_type: String,
        /// File content
        bytes: Zeroizing<Vec<u8>>,
    },
}

impl RevealedSecret {
    /// The message, if this is a text secret.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::File { .. } => None,
        }
    }

    /// The file content, if this is a file secret.
    pub fn file_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Text(_) => None,
            Self::File { bytes, .. } => Some(bytes.as_slice()),
        }
    }
}

/// Bytes to seal for `input`.
pub fn frame_payload(input: &SecretInput) -> Zeroizing<Vec<u8>> {
    match input {
        SecretInput::Text(text) => Zeroizing::new(text.as_bytes().to_vec()),
        SecretInput::File { bytes, .. } => Zeroizing::new(STANDARD.encode(bytes).into_bytes()),
    }
}

/// Rebuild the secret from opened plaintext.
///
/// Text that is not valid UTF-8 is decoded lossily. A file payload that is
/// not valid base64 fails like any other decryption failure.
pub fn reveal_payload(
    plaintext: &[u8],
    metadata: &Metadata,
) -> Result<RevealedSecret, DecryptionError> {
    let (kind, file_name, file_type) = match metadata {
        Metadata::Text => {
            let text = String::from_utf8_lossy(plaintext).into_owned();
            return Ok(RevealedSecret::Text(Zeroizing::new(text)));
        },
        Metadata::Photo { file_name, file_type } => (FileKind::Photo, file_name, file_type),
        Metadata::Document { file_name, file_type } => (FileKind::Document, file_name, file_type),
    };

    let bytes = STANDARD.decode(plaintext).map_err(|_| DecryptionError)?;
    let or_default = |value: &str, default: &str| {
        if value.is_empty() { default.to_string() } else { value.to_string() }
    };

    Ok(RevealedSecret::File {
        kind,
        file_name: or_default(file_name, DEFAULT_FILE_NAME),
        file_type: or_default(file_type, DEFAULT_FILE_TYPE),
        bytes: Zeroizing::new(bytes),
    })
}
