//! onceread Core
//!
//! Domain types and protocol logic for one-time secret links, with no I/O.
//! A sender seals a payload under a passphrase and submits only ciphertext;
//! the store hands each envelope out at most once; a recipient's
//! [`Retrieval`] performs that single destructive read and decrypts locally.
//!
//! # Architecture
//!
//! ```text
//! sender:    SecretInput ──compose──▶ CreateRequest ──▶ SecretStore::put ──▶ EnvelopeId
//!                              └──▶ LinkKey ──▶ ShareLink {base}/secret/{id}#{key}
//!
//! recipient: ShareLink ──▶ Retrieval::lookup ──get_and_delete (once)──▶ Envelope
//!                              └──▶ password? ──▶ DecryptJob::run ──▶ RevealedSecret
//! ```
//!
//! Time and entropy come from an injected [`Environment`] and the store from
//! an injected [`SecretStore`], so every piece runs under a simulated clock in
//! tests.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod compose;
pub mod env;
pub mod envelope;
pub mod error;
pub mod limits;
pub mod link;
pub mod payload;
pub mod retrieval;
pub mod store;

#[cfg(test)]
mod test_support;

pub use compose::{ComposedSecret, Protection, compose};
pub use env::{Environment, Timestamp};
pub use envelope::{
    CreateRequest, Envelope, EnvelopeDraft, EnvelopeId, FileKind, Metadata, SecretKind,
    WireEnvelope,
};
pub use error::{SecretError, StorageError, ValidationError};
pub use link::ShareLink;
pub use payload::{RevealedSecret, SecretInput, frame_payload, reveal_payload};
pub use retrieval::{DecryptJob, Retrieval, RetrievalError, RetrievalStatus};
pub use store::SecretStore;
