//! Sender-side composition: validate, frame, seal.
//!
//! Runs entirely before anything reaches the store; the resulting
//! [`CreateRequest`] carries only ciphertext.

use std::time::Duration;

use onceread_crypto::{BlobRandomness, LinkKey, seal_with};
use url::Url;
use zeroize::Zeroizing;

use crate::{
    env::Environment,
    envelope::{CreateRequest, EnvelopeId, Metadata, SecretKind},
    error::ValidationError,
    limits::{MAX_TTL, validate_file, validate_password, validate_text, validate_ttl},
    link::ShareLink,
    payload::{SecretInput, frame_payload},
};

/// How the recipient obtains the passphrase.
#[derive(Clone, PartialEq, Eq)]
pub enum Protection {
    /// Random key carried in the link fragment
    LinkKey,
    /// Password shared out of band
    Password(Zeroizing<String>),
}

impl Protection {
    /// Password protection.
    pub fn password(password: impl Into<String>) -> Self {
        Self::Password(Zeroizing::new(password.into()))
    }

    /// Whether the recipient will be prompted for a password.
    pub fn is_password(&self) -> bool {
        matches!(self, Self::Password(_))
    }
}

impl std::fmt::Debug for Protection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LinkKey => f.write_str("LinkKey"),
            Self::Password(_) => f.write_str("Password(..)"),
        }
    }
}

/// A sealed secret ready for `create`, plus the key for its link.
#[derive(Debug, Clone)]
pub struct ComposedSecret {
    /// Submission for the service boundary
    pub request: CreateRequest,
    /// Fragment key; `None` for password protection
    pub link_key: Option<LinkKey>,
}

impl ComposedSecret {
    /// The share link for this secret once the store has assigned `id`.
    pub fn share_link(&self, base: Url, id: EnvelopeId) -> Result<ShareLink, ValidationError> {
        ShareLink::new(base, id, self.link_key.as_ref().map(|key| key.as_str().to_string()))
    }
}

/// Validate and seal `input` for submission.
///
/// Salt, nonce and link key all come from `env`. CPU-bound (one PBKDF2
/// derivation).
pub fn compose<E: Environment>(
    env: &E,
    input: &SecretInput,
    protection: &Protection,
    ttl: Duration,
) -> Result<ComposedSecret, ValidationError> {
    let metadata = match input {
        SecretInput::Text(text) => {
            validate_text(text)?;
            Metadata::Text
        },
        SecretInput::File { kind, file_name, file_type, bytes } => {
            validate_file(bytes)?;
            Metadata::from_parts(
                Some(SecretKind::from(*kind).as_str()),
                Some(file_name),
                Some(file_type),
            )?
        },
    };
    validate_ttl(ttl, MAX_TTL)?;

    let (link_key, passphrase) = match protection {
        Protection::LinkKey => {
            let key = LinkKey::from_bytes(env.random_array());
            let passphrase = Zeroizing::new(key.as_str().to_string());
            (Some(key), passphrase)
        },
        Protection::Password(password) => {
            validate_password(password)?;
            (None, password.clone())
        },
    };

    let randomness = BlobRandomness { salt: env.random_array(), nonce: env.random_array() };
    let blob = seal_with(&frame_payload(input), passphrase.as_bytes(), randomness);

    Ok(ComposedSecret {
        request: CreateRequest::new(blob, ttl, protection.is_password(), &metadata),
        link_key,
    })
}
