//! onceread Cryptographic Primitives
//!
//! Turns a plaintext payload and a passphrase into a self-contained,
//! tamper-evident blob, and inverts that transformation. The core functions
//! are pure: callers that need reproducible output provide the random salt
//! and nonce themselves. Thin wrappers draw that randomness from the OS.
//!
//! # Blob Layout
//!
//! ```text
//! base64( salt (16) ‖ nonce (12) ‖ ciphertext ‖ tag (16) )
//!          │            │            └── AES-256-GCM, no associated data
//!          │            └── fresh per blob
//!          └── fresh per blob, feeds PBKDF2
//!
//! passphrase ──PBKDF2-HMAC-SHA256 (100k, salt)──▶ 256-bit key
//! ```
//!
//! The passphrase is either a random link key (16 bytes, hex encoded, carried
//! in a URL fragment) or a password chosen by the sender. Both go through the
//! same key derivation; the blob does not record which one was used.
//!
//! # Security
//!
//! Confidentiality and integrity:
//! - AES-256-GCM authenticates the whole ciphertext; a wrong passphrase, a
//!   flipped byte or a swapped salt/nonce all fail tag verification
//! - No partial plaintext is ever returned from a failed open
//!
//! No decryption oracle:
//! - Every failure while opening (bad base64, truncated blob, tag mismatch)
//!   is reported as the same [`DecryptionError`]
//!
//! Freshness:
//! - Salt and nonce are drawn per call, so sealing the same payload twice
//!   under the same passphrase yields unrelated blobs
//!
//! Key hygiene:
//! - Derived keys and opened plaintext live in `Zeroizing` buffers

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod blob;
mod error;
mod key;

pub use blob::{
    BlobRandomness, HEADER_SIZE, NONCE_SIZE, SALT_SIZE, TAG_SIZE, decrypt, encrypt,
    sealed_len, seal_with,
};
pub use error::{CipherError, DecryptionError};
pub use key::{DerivedKey, KEY_SIZE, LINK_KEY_BYTES, LinkKey, PBKDF2_ITERATIONS, derive_key};
