//! Sealed blob construction and opening using AES-256-GCM.
//!
//! [`seal_with`] is pure: salt and nonce come from the caller. [`encrypt`]
//! draws them from the OS and delegates.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use zeroize::Zeroizing;

use crate::{
    error::{CipherError, DecryptionError},
    key::derive_key,
};

/// PBKDF2 salt size (16 bytes)
pub const SALT_SIZE: usize = 16;

/// AES-GCM nonce size (12 bytes)
pub const NONCE_SIZE: usize = 12;

/// GCM authentication tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Salt plus nonce, prepended to every blob.
pub const HEADER_SIZE: usize = SALT_SIZE + NONCE_SIZE;

/// Per-blob randomness: PBKDF2 salt and GCM nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobRandomness {
    /// PBKDF2 salt
    pub salt: [u8; SALT_SIZE],
    /// AES-GCM nonce
    pub nonce: [u8; NONCE_SIZE],
}

impl BlobRandomness {
    /// Draw a fresh salt and nonce from the OS RNG.
    pub fn generate() -> Result<Self, CipherError> {
        let mut salt = [0u8; SALT_SIZE];
        let mut nonce = [0u8; NONCE_SIZE];
        getrandom::fill(&mut salt)?;
        getrandom::fill(&mut nonce)?;
        Ok(Self { salt, nonce })
    }
}

/// Length of the base64 blob that sealing `plaintext_len` bytes produces.
pub const fn sealed_len(plaintext_len: usize) -> usize {
    (HEADER_SIZE + plaintext_len + TAG_SIZE).div_ceil(3) * 4
}

/// Seal `plaintext` under `passphrase` with caller-provided randomness.
///
/// Returns `base64(salt ‖ nonce ‖ ciphertext ‖ tag)` using the standard
/// alphabet with padding.
///
/// # Security
///
/// - Caller MUST provide a fresh salt and nonce per call in production
/// - Reusing a (key, nonce) pair under GCM leaks the XOR of plaintexts
pub fn seal_with(plaintext: &[u8], passphrase: &[u8], randomness: BlobRandomness) -> String {
    let key = derive_key(passphrase, &randomness.salt);
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let Ok(ciphertext) = cipher.encrypt(Nonce::from_slice(&randomness.nonce), plaintext) else {
        unreachable!("AES-256-GCM encryption cannot fail below the 64 GiB plaintext limit");
    };

    let mut raw = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    raw.extend_from_slice(&randomness.salt);
    raw.extend_from_slice(&randomness.nonce);
    raw.extend_from_slice(&ciphertext);
    STANDARD.encode(raw)
}

/// Seal `plaintext` under `passphrase` with a fresh OS-drawn salt and nonce.
///
/// Two calls with identical inputs produce different blobs.
pub fn encrypt(plaintext: &[u8], passphrase: &str) -> Result<String, CipherError> {
    let randomness = BlobRandomness::generate()?;
    Ok(seal_with(plaintext, passphrase.as_bytes(), randomness))
}

/// Open a blob produced by [`encrypt`] or [`seal_with`].
///
/// # Errors
///
/// - `DecryptionError`: the blob is not valid base64, is shorter than
///   header plus tag, or fails authentication under `passphrase`
pub fn decrypt(blob: &str, passphrase: &str) -> Result<Zeroizing<Vec<u8>>, DecryptionError> {
    let raw = STANDARD.decode(blob).map_err(|_| DecryptionError)?;
    if raw.len() < HEADER_SIZE + TAG_SIZE {
        return Err(DecryptionError);
    }

    let (salt, rest) = raw.split_at(SALT_SIZE);
    let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);
    let salt: &[u8; SALT_SIZE] = salt.try_into().map_err(|_| DecryptionError)?;

    let key = derive_key(passphrase.as_bytes(), salt);
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| DecryptionError)
}
