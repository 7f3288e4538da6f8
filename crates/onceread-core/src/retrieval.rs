//! Retrieval state machine.
//!
//! Sequences "locate envelope → obtain key → decrypt → reveal or fail" for
//! one recipient. The machine performs no I/O of its own: [`Retrieval::lookup`]
//! takes the store capability explicitly, and the CPU-bound decryption is
//! split out as a [`DecryptJob`] the caller may run on any thread.
//!
//! # States
//!
//! ```text
//!                   ┌─▶ NotFound
//! AwaitingLookup ───┼─▶ PasswordRequired ──supply_password──┐
//!                   ├─▶ ReadyToDecrypt ◀────────────────────┘
//!                   └─▶ DecryptionFailed (no fragment key)
//!
//! ReadyToDecrypt ──begin_decrypt──▶ Decrypting ──finish──▶ Revealed | DecryptionFailed
//! ```
//!
//! # Invariants
//!
//! - `get_and_delete` is called exactly once, eagerly, on the first
//!   `lookup`. Looking a secret up consumes it, whatever happens afterwards.
//! - The password prompt decrypts the blob captured by that single fetch; a
//!   wrong password destroys the secret instead of allowing another guess.
//! - `NotFound`, `Revealed` and `DecryptionFailed` are terminal.

use std::fmt;

use onceread_crypto::{DecryptionError, decrypt};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::{
    envelope::{Envelope, EnvelopeId, Metadata},
    error::StorageError,
    payload::{RevealedSecret, reveal_payload},
    store::SecretStore,
};

/// Observable retrieval state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetrievalStatus {
    /// Nothing fetched yet
    AwaitingLookup,
    /// Absent, expired or already consumed (terminal)
    NotFound,
    /// Envelope captured; waiting for the recipient's password
    PasswordRequired,
    /// Envelope captured and a passphrase is available
    ReadyToDecrypt,
    /// Decryption job handed out, outcome pending
    Decrypting,
    /// Secret opened (terminal)
    Revealed,
    /// Envelope consumed but could not be opened (terminal)
    DecryptionFailed,
}

impl RetrievalStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::NotFound | Self::Revealed | Self::DecryptionFailed)
    }
}

impl fmt::Display for RetrievalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Errors from driving a [`Retrieval`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    /// Operation not valid in the current state
    #[error("invalid retrieval transition: cannot {operation} from {from}")]
    InvalidTransition {
        /// State when the operation was attempted
        from: RetrievalStatus,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// The single destructive fetch failed; the retrieval is now `NotFound`
    #[error(transparent)]
    Storage(#[from] StorageError),
}

enum State {
    AwaitingLookup,
    NotFound,
    PasswordRequired { envelope: Envelope },
    ReadyToDecrypt { envelope: Envelope, passphrase: Zeroizing<String> },
    Decrypting,
    Revealed(RevealedSecret),
    DecryptionFailed,
}

impl State {
    fn status(&self) -> RetrievalStatus {
        match self {
            Self::AwaitingLookup => RetrievalStatus::AwaitingLookup,
            Self::NotFound => RetrievalStatus::NotFound,
            Self::PasswordRequired { .. } => RetrievalStatus::PasswordRequired,
            Self::ReadyToDecrypt { .. } => RetrievalStatus::ReadyToDecrypt,
            Self::Decrypting => RetrievalStatus::Decrypting,
            Self::Revealed(_) => RetrievalStatus::Revealed,
            Self::DecryptionFailed => RetrievalStatus::DecryptionFailed,
        }
    }
}

/// One recipient's attempt to read one secret.
pub struct Retrieval {
    id: EnvelopeId,
    fragment_key: Option<Zeroizing<String>>,
    state: State,
}

impl Retrieval {
    /// Start a retrieval for `id`. `fragment_key` is the link-fragment
    /// passphrase, if the link carried one.
    pub fn new(id: EnvelopeId, fragment_key: Option<String>) -> Self {
        Self {
            id,
            fragment_key: fragment_key.filter(|k| !k.is_empty()).map(Zeroizing::new),
            state: State::AwaitingLookup,
        }
    }

    /// Envelope id being retrieved.
    pub fn id(&self) -> EnvelopeId {
        self.id
    }

    /// Current state.
    pub fn status(&self) -> RetrievalStatus {
        self.state.status()
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// The opened secret, once `Revealed`.
    pub fn revealed(&self) -> Option<&RevealedSecret> {
        match &self.state {
            State::Revealed(secret) => Some(secret),
            _ => None,
        }
    }

    /// Consume the retrieval, yielding the opened secret if `Revealed`.
    pub fn into_revealed(self) -> Option<RevealedSecret> {
        match self.state {
            State::Revealed(secret) => Some(secret),
            _ => None,
        }
    }

    /// Perform the single destructive fetch.
    ///
    /// A password-protected envelope moves to `PasswordRequired` (any
    /// fragment key is ignored). An unprotected envelope moves to
    /// `ReadyToDecrypt` with the fragment key, or fails closed to
    /// `DecryptionFailed` when the link carried none.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` unless `AwaitingLookup`; the store is not touched
    /// - `Storage` if the fetch failed; the retrieval becomes `NotFound`
    pub fn lookup<S: SecretStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> Result<RetrievalStatus, RetrievalError> {
        self.require(RetrievalStatus::AwaitingLookup, "lookup")?;

        let envelope = match store.get_and_delete(&self.id) {
            Ok(Some(envelope)) => envelope,
            Ok(None) => {
                self.state = State::NotFound;
                return Ok(self.status());
            },
            Err(err) => {
                self.state = State::NotFound;
                return Err(err.into());
            },
        };

        self.state = if envelope.password_protected {
            State::PasswordRequired { envelope }
        } else {
            match self.fragment_key.take() {
                Some(passphrase) => State::ReadyToDecrypt { envelope, passphrase },
                None => State::DecryptionFailed,
            }
        };
        Ok(self.status())
    }

    /// Provide the recipient's password for the captured envelope.
    pub fn supply_password(
        &mut self,
        password: impl Into<String>,
    ) -> Result<RetrievalStatus, RetrievalError> {
        self.require(RetrievalStatus::PasswordRequired, "supply password")?;

        self.state = match std::mem::replace(&mut self.state, State::Decrypting) {
            State::PasswordRequired { envelope } => {
                State::ReadyToDecrypt { envelope, passphrase: Zeroizing::new(password.into()) }
            },
            other => other,
        };
        Ok(self.status())
    }

    /// Move to `Decrypting` and hand out the CPU-bound work.
    ///
    /// The job owns everything it needs and is `Send`, so async callers can
    /// run it on a blocking pool and report back through [`Self::finish`].
    pub fn begin_decrypt(&mut self) -> Result<DecryptJob, RetrievalError> {
        self.require(RetrievalStatus::ReadyToDecrypt, "begin decrypt")?;

        match std::mem::replace(&mut self.state, State::Decrypting) {
            State::ReadyToDecrypt { envelope, passphrase } => Ok(DecryptJob {
                blob: envelope.ciphertext,
                passphrase,
                metadata: envelope.metadata,
            }),
            other => {
                let from = other.status();
                self.state = other;
                Err(RetrievalError::InvalidTransition { from, operation: "begin decrypt" })
            },
        }
    }

    /// Record the outcome of a [`DecryptJob`].
    pub fn finish(
        &mut self,
        outcome: Result<RevealedSecret, DecryptionError>,
    ) -> Result<RetrievalStatus, RetrievalError> {
        self.require(RetrievalStatus::Decrypting, "finish")?;

        self.state = match outcome {
            Ok(secret) => State::Revealed(secret),
            Err(DecryptionError) => State::DecryptionFailed,
        };
        Ok(self.status())
    }

    /// Decrypt on the current thread: `begin_decrypt`, run, `finish`.
    pub fn decrypt(&mut self) -> Result<RetrievalStatus, RetrievalError> {
        let job = self.begin_decrypt()?;
        self.finish(job.run())
    }

    fn require(
        &self,
        required: RetrievalStatus,
        operation: &'static str,
    ) -> Result<(), RetrievalError> {
        let from = self.status();
        if from == required {
            Ok(())
        } else {
            Err(RetrievalError::InvalidTransition { from, operation })
        }
    }
}

impl fmt::Debug for Retrieval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrieval")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Self-contained decryption work for one captured envelope.
pub struct DecryptJob {
    blob: String,
    passphrase: Zeroizing<String>,
    metadata: Metadata,
}

impl DecryptJob {
    /// Open the blob and rebuild the payload. CPU-bound (PBKDF2).
    pub fn run(self) -> Result<RevealedSecret, DecryptionError> {
        let plaintext = decrypt(&self.blob, &self.passphrase)?;
        reveal_payload(&plaintext, &self.metadata)
    }
}

impl fmt::Debug for DecryptJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptJob").field("kind", &self.metadata.kind()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use onceread_crypto::{BlobRandomness, seal_with};

    use super::*;
    use crate::{
        envelope::{EnvelopeDraft, FileKind},
        test_support::FakeStore,
    };

    const RANDOMNESS: BlobRandomness = BlobRandomness { salt: [1; 16], nonce: [2; 12] };

    fn store_secret(
        store: &FakeStore,
        plaintext: &[u8],
        passphrase: &str,
        password_protected: bool,
        metadata: Metadata,
    ) -> EnvelopeId {
        let draft = EnvelopeDraft {
            ciphertext: seal_with(plaintext, passphrase.as_bytes(), RANDOMNESS),
            password_protected,
            metadata,
        };
        store.put(draft, Duration::from_secs(3_600)).unwrap()
    }

    #[test]
    fn fragment_key_reveals_text() {
        let store = FakeStore::default();
        let id = store_secret(&store, b"hello", "k1", false, Metadata::Text);

        let mut retrieval = Retrieval::new(id, Some("k1".into()));
        assert_eq!(retrieval.lookup(&store).unwrap(), RetrievalStatus::ReadyToDecrypt);
        assert_eq!(retrieval.decrypt().unwrap(), RetrievalStatus::Revealed);
        assert_eq!(retrieval.revealed().and_then(RevealedSecret::as_text), Some("hello"));
        assert!(retrieval.is_terminal());
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = FakeStore::default();
        let mut retrieval = Retrieval::new(EnvelopeId::from_random_bytes([7; 16]), None);

        assert_eq!(retrieval.lookup(&store).unwrap(), RetrievalStatus::NotFound);
        assert!(retrieval.is_terminal());
        assert_eq!(store.fetches(), 1);
    }

    #[test]
    fn password_prompt_reuses_the_captured_blob() {
        let store = FakeStore::default();
        let id = store_secret(&store, b"pw secret", "hunter22", true, Metadata::Text);

        let mut retrieval = Retrieval::new(id, None);
        assert_eq!(retrieval.lookup(&store).unwrap(), RetrievalStatus::PasswordRequired);
        assert_eq!(retrieval.supply_password("hunter22").unwrap(), RetrievalStatus::ReadyToDecrypt);
        assert_eq!(retrieval.decrypt().unwrap(), RetrievalStatus::Revealed);

        // ORACLE: exactly one destructive fetch, and the envelope is gone
        assert_eq!(store.fetches(), 1);
        assert!(!store.exists(&id).unwrap());
    }

    #[test]
    fn wrong_password_fails_closed() {
        let store = FakeStore::default();
        let id = store_secret(&store, b"pw secret", "right-pw", true, Metadata::Text);

        let mut retrieval = Retrieval::new(id, None);
        retrieval.lookup(&store).unwrap();
        retrieval.supply_password("wrong-pw").unwrap();
        assert_eq!(retrieval.decrypt().unwrap(), RetrievalStatus::DecryptionFailed);

        // No retry on this retrieval...
        assert!(matches!(
            retrieval.supply_password("right-pw"),
            Err(RetrievalError::InvalidTransition { from: RetrievalStatus::DecryptionFailed, .. })
        ));
        // ...and a fresh retrieval finds nothing
        let mut second = Retrieval::new(id, None);
        assert_eq!(second.lookup(&store).unwrap(), RetrievalStatus::NotFound);
    }

    #[test]
    fn missing_fragment_key_fails_closed_and_consumes() {
        let store = FakeStore::default();
        let id = store_secret(&store, b"x", "k", false, Metadata::Text);

        let mut retrieval = Retrieval::new(id, None);
        assert_eq!(retrieval.lookup(&store).unwrap(), RetrievalStatus::DecryptionFailed);
        assert!(!store.exists(&id).unwrap());
    }

    #[test]
    fn fragment_key_is_ignored_for_password_secrets() {
        let store = FakeStore::default();
        let id = store_secret(&store, b"x", "password", true, Metadata::Text);

        let mut retrieval = Retrieval::new(id, Some("password".into()));
        assert_eq!(retrieval.lookup(&store).unwrap(), RetrievalStatus::PasswordRequired);
    }

    #[test]
    fn second_lookup_is_rejected_without_touching_store() {
        let store = FakeStore::default();
        let id = store_secret(&store, b"x", "k", false, Metadata::Text);

        let mut retrieval = Retrieval::new(id, Some("k".into()));
        retrieval.lookup(&store).unwrap();
        let err = retrieval.lookup(&store).unwrap_err();

        assert_eq!(
            err,
            RetrievalError::InvalidTransition {
                from: RetrievalStatus::ReadyToDecrypt,
                operation: "lookup"
            }
        );
        assert_eq!(store.fetches(), 1);
    }

    #[test]
    fn storage_failure_moves_to_not_found() {
        let store = FakeStore::default();
        store.fail_next_fetch();

        let mut retrieval = Retrieval::new(EnvelopeId::from_random_bytes([1; 16]), None);
        assert!(matches!(retrieval.lookup(&store), Err(RetrievalError::Storage(_))));
        assert_eq!(retrieval.status(), RetrievalStatus::NotFound);
    }

    #[test]
    fn decrypt_job_can_run_elsewhere() {
        let store = FakeStore::default();
        let id = store_secret(
            &store,
            b"AAEC",
            "k",
            false,
            Metadata::file(FileKind::Document, "d.bin", "application/octet-stream"),
        );

        let mut retrieval = Retrieval::new(id, Some("k".into()));
        retrieval.lookup(&store).unwrap();
        let job = retrieval.begin_decrypt().unwrap();
        assert_eq!(retrieval.status(), RetrievalStatus::Decrypting);

        let outcome = std::thread::spawn(move || job.run()).join().unwrap();
        assert_eq!(retrieval.finish(outcome).unwrap(), RetrievalStatus::Revealed);
        assert_eq!(retrieval.revealed().and_then(RevealedSecret::file_bytes), Some(&[0u8, 1, 2][..]));
    }

    #[test]
    fn out_of_order_operations_are_rejected() {
        let mut retrieval = Retrieval::new(EnvelopeId::from_random_bytes([4; 16]), None);

        assert!(retrieval.supply_password("pw").is_err());
        assert!(retrieval.begin_decrypt().is_err());
        assert!(retrieval.finish(Err(DecryptionError)).is_err());
        assert_eq!(retrieval.status(), RetrievalStatus::AwaitingLookup);
    }
}
