//! Key material: link keys and PBKDF2 derivation.

use std::fmt;

use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::CipherError;

/// Raw entropy in a link key (128 bits).
pub const LINK_KEY_BYTES: usize = 16;

/// Derived AES-256 key size.
pub const KEY_SIZE: usize = 32;

/// PBKDF2-HMAC-SHA256 iteration count.
///
/// Fixed: blobs carry no KDF parameters, so changing this breaks every
/// outstanding link.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Random passphrase that travels in a URL fragment.
///
/// 16 random bytes rendered as 32 lowercase hex characters. The hex text
/// itself (not the decoded bytes) is the passphrase fed to [`derive_key`].
#[derive(Clone, PartialEq, Eq)]
pub struct LinkKey(Zeroizing<String>);

impl LinkKey {
    /// Generate a fresh link key from the OS RNG.
    pub fn generate() -> Result<Self, CipherError> {
        let mut bytes = Zeroizing::new([0u8; LINK_KEY_BYTES]);
        getrandom::fill(bytes.as_mut())?;
        Ok(Self::from_bytes(*bytes))
    }

    /// Build a link key from caller-provided entropy.
    pub fn from_bytes(bytes: [u8; LINK_KEY_BYTES]) -> Self {
        Self(Zeroizing::new(hex::encode(bytes)))
    }

    /// The passphrase text (32 hex characters).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LinkKey(..)")
    }
}

/// 256-bit AES key derived from a passphrase. Zeroized on drop.
pub struct DerivedKey(Zeroizing<[u8; KEY_SIZE]>);

impl DerivedKey {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Derive an AES-256 key from a passphrase and a 16-byte salt.
///
/// Deterministic: the same passphrase and salt always give the same key.
/// CPU-bound (100k HMAC rounds); async callers should run it off the executor.
pub fn derive_key(passphrase: &[u8], salt: &[u8; 16]) -> DerivedKey {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase, salt, PBKDF2_ITERATIONS, key.as_mut());
    DerivedKey(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_key_is_32_lowercase_hex_chars() {
        let key = LinkKey::generate().unwrap();
        assert_eq!(key.as_str().len(), 32);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn link_key_from_bytes_is_hex_of_bytes() {
        let key = LinkKey::from_bytes([0xAB; LINK_KEY_BYTES]);
        assert_eq!(key.as_str(), "abababababababababababababababab");
    }

    #[test]
    fn generated_link_keys_differ() {
        let a = LinkKey::generate().unwrap();
        let b = LinkKey::generate().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn link_key_debug_hides_value() {
        let key = LinkKey::from_bytes([0x11; LINK_KEY_BYTES]);
        assert!(!format!("{key:?}").contains("1111"));
    }

    #[test]
    fn derive_is_deterministic() {
        let salt = [7u8; 16];
        let a = derive_key(b"correct horse", &salt);
        let b = derive_key(b"correct horse", &salt);
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_salts_produce_different_keys() {
        let a = derive_key(b"passphrase", &[0u8; 16]);
        let b = derive_key(b"passphrase", &[1u8; 16]);
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_passphrases_produce_different_keys() {
        let salt = [3u8; 16];
        let a = derive_key(b"alpha", &salt);
        let b = derive_key(b"bravo", &salt);
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn empty_passphrase_still_derives() {
        let key = derive_key(b"", &[0u8; 16]);
        assert_eq!(key.as_bytes().len(), KEY_SIZE);
    }
}
