//! Fuzz target for blob decryption
//!
//! Feeds arbitrary blobs and passphrases to `decrypt`. Truncated, non-base64
//! and tampered blobs must all come back as `DecryptionError`, never a panic.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use onceread_crypto::{BlobRandomness, decrypt, seal_with};

#[derive(Debug, Arbitrary)]
enum Input<'a> {
    /// Raw text as the blob
    Raw { blob: &'a str, passphrase: &'a str },
    /// A valid blob with one byte of its base64 text replaced
    Tampered { plaintext: &'a [u8], passphrase: &'a str, index: u16, byte: u8 },
}

fuzz_target!(|input: Input<'_>| {
    match input {
        Input::Raw { blob, passphrase } => {
            let _ = decrypt(blob, passphrase);
        },
        Input::Tampered { plaintext, passphrase, index, byte } => {
            let randomness = BlobRandomness { salt: [3; 16], nonce: [5; 12] };
            let blob = seal_with(plaintext, passphrase.as_bytes(), randomness);
            let mut bytes = blob.clone().into_bytes();
            let index = usize::from(index) % bytes.len();
            bytes[index] = byte;

            let Ok(tampered) = String::from_utf8(bytes) else { return };
            let opened = decrypt(&tampered, passphrase);
            if tampered == blob {
                assert_eq!(opened.as_deref().ok().map(|p| p.as_slice()), Some(plaintext));
            } else {
                assert!(opened.is_err(), "tampered blob opened");
            }
        },
    }
});
