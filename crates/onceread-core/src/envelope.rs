//! Envelope model and its wire shape.
//!
//! An [`Envelope`] is the record the store holds: a sealed blob plus the
//! metadata needed to turn the opened plaintext back into text or a file.
//! [`WireEnvelope`] is the flat camelCase JSON form exchanged at the service
//! boundary; [`CreateRequest`] is what a sender submits.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    env::{Environment, Timestamp, duration_millis},
    error::ValidationError,
};

/// Content type reported for files submitted without one.
pub const DEFAULT_FILE_TYPE: &str = "application/octet-stream";

/// 128-bit random envelope identifier, rendered as a UUIDv4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvelopeId(Uuid);

impl EnvelopeId {
    /// Build an id from 16 random bytes, setting the RFC 4122 v4 bits.
    pub fn from_random_bytes(bytes: [u8; 16]) -> Self {
        Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }

    /// Draw a fresh id from the environment's entropy.
    pub fn generate<E: Environment>(env: &E) -> Self {
        Self::from_random_bytes(env.random_array())
    }

    /// Rebuild an id from its stored byte form.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Raw 16-byte form (storage keys).
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for EnvelopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for EnvelopeId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::try_parse(s).map(Self).map_err(|_| ValidationError::InvalidId(s.to_string()))
    }
}

/// What kind of payload an envelope carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretKind {
    /// UTF-8 text
    #[default]
    Text,
    /// Image file
    Photo,
    /// Arbitrary file
    Document,
}

impl SecretKind {
    /// Wire tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Photo => "photo",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecretKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "photo" => Ok(Self::Photo),
            "document" => Ok(Self::Document),
            other => Err(ValidationError::UnknownMessageType(other.to_string())),
        }
    }
}

/// File-bearing secret kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Image file
    Photo,
    /// Arbitrary file
    Document,
}

impl From<FileKind> for SecretKind {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::Photo => Self::Photo,
            FileKind::Document => Self::Document,
        }
    }
}

/// How to reconstruct the opened plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Metadata {
    /// Plaintext is the message itself
    Text,
    /// Plaintext is a base64-encoded image
    Photo {
        /// Declared file name
        file_name: String,
        /// Declared content type
        file_type: String,
    },
    /// Plaintext is a base64-encoded file
    Document {
        /// Declared file name
        file_name: String,
        /// Declared content type
        file_type: String,
    },
}

impl Metadata {
    /// Metadata for a file of the given kind.
    pub fn file(
        kind: FileKind,
        file_name: impl Into<String>,
        file_type: impl Into<String>,
    ) -> Self {
        let (file_name, file_type) = (file_name.into(), file_type.into());
        match kind {
            FileKind::Photo => Self::Photo { file_name, file_type },
            FileKind::Document => Self::Document { file_name, file_type },
        }
    }

    /// Build metadata from the flat optional wire fields.
    ///
    /// A missing message type means text. File kinds require a file name; a
    /// missing content type becomes [`DEFAULT_FILE_TYPE`]. Photos must carry
    /// an `image/*` type or none at all.
    pub fn from_parts(
        message_type: Option<&str>,
        file_name: Option<&str>,
        file_type: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let kind = match message_type {
            None => SecretKind::Text,
            Some(tag) => tag.parse()?,
        };
        let file_kind = match kind {
            SecretKind::Text => return Ok(Self::Text),
            SecretKind::Photo => FileKind::Photo,
            SecretKind::Document => FileKind::Document,
        };

        let file_name = file_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(ValidationError::MissingFileName { kind: kind.as_str() })?;
        let file_type = file_type.filter(|t| !t.is_empty());
        // An untyped photo is stored under the default type and must still parse
        let not_an_image = |t: &&str| !t.starts_with("image/") && *t != DEFAULT_FILE_TYPE;
        if let Some(t) = file_type.filter(|t| file_kind == FileKind::Photo && not_an_image(t)) {
            return Err(ValidationError::NotAnImage(t.to_string()));
        }

        Ok(Self::file(file_kind, file_name, file_type.unwrap_or(DEFAULT_FILE_TYPE)))
    }

    /// Payload kind.
    pub fn kind(&self) -> SecretKind {
        match self {
            Self::Text => SecretKind::Text,
            Self::Photo { .. } => SecretKind::Photo,
            Self::Document { .. } => SecretKind::Document,
        }
    }

    /// Declared file name, `None` for text.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Text => None,
            Self::Photo { file_name, .. } | Self::Document { file_name, .. } => {
                Some(file_name.as_str())
            },
        }
    }

    /// Declared content type, `None` for text.
    pub fn file_type(&self) -> Option<&str> {
        match self {
            Self::Text => None,
            Self::Photo { file_type, .. } | Self::Document { file_type, .. } => {
                Some(file_type.as_str())
            },
        }
    }
}

/// An envelope before the store has assigned its id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeDraft {
    /// Base64 sealed blob
    pub ciphertext: String,
    /// Whether the recipient must supply a password
    pub password_protected: bool,
    /// Payload reconstruction hints
    pub metadata: Metadata,
}

/// A stored secret. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Store-assigned identifier
    pub id: EnvelopeId,
    /// Base64 sealed blob (`salt ‖ nonce ‖ ciphertext ‖ tag`)
    pub ciphertext: String,
    /// Insertion time
    pub created_at: Timestamp,
    /// Expiry time, strictly after `created_at`
    pub expires_at: Timestamp,
    /// Whether the recipient must supply a password
    pub password_protected: bool,
    /// Payload reconstruction hints
    pub metadata: Metadata,
}

impl Envelope {
    /// Stamp a draft with its id and lifetime.
    pub fn from_draft(id: EnvelopeId, draft: EnvelopeDraft, now: Timestamp, ttl: Duration) -> Self {
        Self {
            id,
            ciphertext: draft.ciphertext,
            created_at: now,
            expires_at: now.saturating_add(ttl),
            password_protected: draft.password_protected,
            metadata: draft.metadata,
        }
    }

    /// Live means unexpired: `expires_at > now`.
    pub fn is_live_at(&self, now: Timestamp) -> bool {
        self.expires_at > now
    }
}

/// Envelope as exchanged over the service boundary.
///
/// Timestamps are unix milliseconds. Unknown message types and inconsistent
/// fields are rejected when converting back to an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEnvelope {
    /// Hyphenated UUID string
    pub id: String,
    /// Base64 sealed blob
    pub encrypted_content: String,
    /// Unix millis
    pub created_at: u64,
    /// Unix millis
    pub expires_at: u64,
    /// Whether the recipient must supply a password
    pub password_protected: bool,
    /// File name for photo/document secrets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Content type for photo/document secrets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    /// `"text"`, `"photo"` or `"document"`; absent means text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
}

impl WireEnvelope {
    /// Parse and validate a JSON envelope.
    pub fn decode_json(json: &str) -> Result<Envelope, ValidationError> {
        let wire: Self =
            serde_json::from_str(json).map_err(|_| ValidationError::MalformedContent)?;
        Envelope::try_from(wire)
    }

    /// JSON form.
    pub fn to_json(&self) -> String {
        // A struct of strings, integers and bools always serializes
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<Envelope> for WireEnvelope {
    fn from(envelope: Envelope) -> Self {
        let file_name = envelope.metadata.file_name().map(str::to_string);
        let file_type = envelope.metadata.file_type().map(str::to_string);
        Self {
            id: envelope.id.to_string(),
            encrypted_content: envelope.ciphertext,
            created_at: envelope.created_at.as_millis(),
            expires_at: envelope.expires_at.as_millis(),
            password_protected: envelope.password_protected,
            file_name,
            file_type,
            message_type: Some(envelope.metadata.kind().as_str().to_string()),
        }
    }
}

impl TryFrom<WireEnvelope> for Envelope {
    type Error = ValidationError;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        let id = wire.id.parse()?;
        if wire.expires_at <= wire.created_at {
            return Err(ValidationError::InvalidTimestamps);
        }
        let metadata = Metadata::from_parts(
            wire.message_type.as_deref(),
            wire.file_name.as_deref(),
            wire.file_type.as_deref(),
        )?;

        Ok(Self {
            id,
            ciphertext: wire.encrypted_content,
            created_at: Timestamp::from_millis(wire.created_at),
            expires_at: Timestamp::from_millis(wire.expires_at),
            password_protected: wire.password_protected,
            metadata,
        })
    }
}

/// A sender's submission: sealed content plus lifetime and metadata.
///
/// The boundary never sees plaintext; `encrypted_content` is sealed before
/// this is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    /// Base64 sealed blob
    pub encrypted_content: String,
    /// Requested lifetime in milliseconds
    #[serde(alias = "expiresIn")]
    pub ttl_millis: u64,
    /// Whether the recipient must supply a password
    #[serde(default)]
    pub password_protected: bool,
    /// File name for photo/document secrets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Content type for photo/document secrets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    /// `"text"`, `"photo"` or `"document"`; absent means text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
}

impl CreateRequest {
    /// Build a request from typed parts.
    pub fn new(
        encrypted_content: String,
        ttl: Duration,
        password_protected: bool,
        metadata: &Metadata,
    ) -> Self {
        Self {
            encrypted_content,
            ttl_millis: duration_millis(ttl),
            password_protected,
            file_name: metadata.file_name().map(str::to_string),
            file_type: metadata.file_type().map(str::to_string),
            message_type: Some(metadata.kind().as_str().to_string()),
        }
    }

    /// Requested lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_millis)
    }

    /// Typed metadata from the flat optional fields.
    pub fn metadata(&self) -> Result<Metadata, ValidationError> {
        Metadata::from_parts(
            self.message_type.as_deref(),
            self.file_name.as_deref(),
            self.file_type.as_deref(),
        )
    }
}
