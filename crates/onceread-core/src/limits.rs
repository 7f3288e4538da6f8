//! Size and lifetime limits, and the checks that enforce them.

use std::{fmt, str::FromStr, time::Duration};

use base64::{Engine, engine::general_purpose::STANDARD};
use onceread_crypto::{HEADER_SIZE, TAG_SIZE, sealed_len};

use crate::{env::duration_millis, error::ValidationError};

/// Maximum text secret length, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 10_000;

/// Minimum password length when password protection is chosen.
pub const MIN_PASSWORD_LENGTH: usize = 4;

/// Maximum photo/document size (10 MiB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Largest sealed blob a legitimate submission can produce: a maximal file,
/// base64-framed, then sealed.
pub const MAX_ENCRYPTED_CONTENT_LEN: usize = sealed_len(MAX_FILE_SIZE.div_ceil(3) * 4);

/// Smallest decoded blob: salt, nonce and tag around an empty ciphertext.
pub const MIN_BLOB_LEN: usize = HEADER_SIZE + TAG_SIZE;

/// Longest lifetime a secret may be given.
pub const MAX_TTL: Duration = Expiration::OneWeek.as_duration();

/// Preset lifetimes offered to senders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Expiration {
    /// 3,600,000 ms
    OneHour,
    /// 86,400,000 ms
    #[default]
    OneDay,
    /// 604,800,000 ms
    OneWeek,
}

impl Expiration {
    /// All presets, shortest first.
    pub const ALL: [Self; 3] = [Self::OneHour, Self::OneDay, Self::OneWeek];

    /// Preset lifetime.
    pub const fn as_duration(self) -> Duration {
        match self {
            Self::OneHour => Duration::from_secs(60 * 60),
            Self::OneDay => Duration::from_secs(24 * 60 * 60),
            Self::OneWeek => Duration::from_secs(7 * 24 * 60 * 60),
        }
    }

    /// Short label (`1h`, `1d`, `1w`).
    pub fn label(self) -> &'static str {
        match self {
            Self::OneHour => "1h",
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
        }
    }
}

impl fmt::Display for Expiration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Expiration {
    type Err = ValidationError;

    /// Accepts a label or the preset's exact millisecond count.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|preset| {
                preset.label() == s || duration_millis(preset.as_duration()).to_string() == s
            })
            .ok_or(ValidationError::InvalidTtl {
                ttl_millis: 0,
                max_millis: duration_millis(MAX_TTL),
            })
    }
}

/// Check `ttl` is in `(0, max]` at millisecond precision.
pub fn validate_ttl(ttl: Duration, max: Duration) -> Result<(), ValidationError> {
    if duration_millis(ttl) == 0 || ttl > max {
        return Err(ValidationError::InvalidTtl {
            ttl_millis: duration_millis(ttl),
            max_millis: duration_millis(max),
        });
    }
    Ok(())
}

/// Check a text secret is non-blank and within [`MAX_MESSAGE_LENGTH`].
pub fn validate_text(message: &str) -> Result<(), ValidationError> {
    if message.trim().is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    let len = message.chars().count();
    if len > MAX_MESSAGE_LENGTH {
        return Err(ValidationError::MessageTooLong { len, max: MAX_MESSAGE_LENGTH });
    }
    Ok(())
}

/// Check file content is present and within [`MAX_FILE_SIZE`].
pub fn validate_file(bytes: &[u8]) -> Result<(), ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError::MissingFile);
    }
    if bytes.len() > MAX_FILE_SIZE {
        return Err(ValidationError::FileTooLarge { size: bytes.len(), max: MAX_FILE_SIZE });
    }
    Ok(())
}

/// Check a password meets [`MIN_PASSWORD_LENGTH`].
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort { min: MIN_PASSWORD_LENGTH });
    }
    Ok(())
}

/// Structural check on submitted encrypted content.
///
/// Only shape is checked: size, base64 alphabet and minimum decoded length.
/// Whether it opens is unknowable without the key.
pub fn validate_encrypted_content(content: &str) -> Result<(), ValidationError> {
    if content.len() > MAX_ENCRYPTED_CONTENT_LEN {
        return Err(ValidationError::ContentTooLarge {
            len: content.len(),
            max: MAX_ENCRYPTED_CONTENT_LEN,
        });
    }
    let decoded = STANDARD.decode(content).map_err(|_| ValidationError::MalformedContent)?;
    if decoded.len() < MIN_BLOB_LEN {
        return Err(ValidationError::MalformedContent);
    }
    Ok(())
}
