//! Ephemeral envelope store.
//!
//! Adds the store policy on top of a [`Storage`] backend: id assignment,
//! expiry stamping and lazy sweeping. Expiry is enforced twice. The sweep
//! keeps the backend small, and [`Storage::take_live`] re-checks liveness so
//! an unswept expired envelope is still never returned.

use std::time::Duration;

use onceread_core::{
    Envelope, EnvelopeDraft, EnvelopeId, Environment, SecretError, SecretStore, StorageError,
    Timestamp, ValidationError, env::duration_millis, limits::MAX_TTL,
};

use crate::storage::Storage;

/// Attempts at inserting under a fresh id before giving up on `Conflict`.
const MAX_ID_ATTEMPTS: usize = 4;

/// [`SecretStore`] over any [`Storage`] backend.
///
/// Cheap to clone when the backend is (every backend shares state via Arc).
#[derive(Clone)]
pub struct EphemeralStore<E: Environment, S: Storage> {
    env: E,
    storage: S,
}

impl<E: Environment, S: Storage> EphemeralStore<E, S> {
    /// Create a store reading time and entropy from `env`.
    pub fn new(env: E, storage: S) -> Self {
        Self { env, storage }
    }

    /// The injected environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// The backend (for invariant checks in tests).
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn sweep(&self, now: Timestamp) -> Result<(), StorageError> {
        let removed = self.storage.remove_expired(now)?;
        if removed > 0 {
            tracing::debug!(removed, %now, "swept expired envelopes");
        }
        Ok(())
    }
}

impl<E: Environment, S: Storage> SecretStore for EphemeralStore<E, S> {
    fn put(&self, draft: EnvelopeDraft, ttl: Duration) -> Result<EnvelopeId, SecretError> {
        // Sub-millisecond lifetimes truncate to an already-expired envelope
        let ttl_millis = duration_millis(ttl);
        if ttl_millis == 0 {
            return Err(ValidationError::InvalidTtl {
                ttl_millis,
                max_millis: duration_millis(MAX_TTL),
            }
            .into());
        }

        let now = self.env.now();
        self.sweep(now)?;

        let mut envelope = Envelope::from_draft(EnvelopeId::generate(&self.env), draft, now, ttl);
        for attempt in 1..=MAX_ID_ATTEMPTS {
            match self.storage.insert(&envelope) {
                Ok(()) => {
                    tracing::info!(
                        id = %envelope.id,
                        kind = envelope.metadata.kind().as_str(),
                        password_protected = envelope.password_protected,
                        expires_at = %envelope.expires_at,
                        "stored envelope"
                    );
                    return Ok(envelope.id);
                },
                Err(StorageError::Conflict(id)) => {
                    tracing::warn!(%id, attempt, "envelope id collision, regenerating");
                    envelope.id = EnvelopeId::generate(&self.env);
                },
                Err(err) => return Err(err.into()),
            }
        }

        tracing::error!(attempts = MAX_ID_ATTEMPTS, "could not assign a unique envelope id");
        Err(SecretError::Storage(StorageError::Io(format!(
            "no unique id after {MAX_ID_ATTEMPTS} attempts"
        ))))
    }

    fn exists(&self, id: &EnvelopeId) -> Result<bool, StorageError> {
        let now = self.env.now();
        Ok(self.storage.peek(id)?.is_some_and(|envelope| envelope.is_live_at(now)))
    }

    fn get_and_delete(&self, id: &EnvelopeId) -> Result<Option<Envelope>, StorageError> {
        let now = self.env.now();
        self.sweep(now)?;

        let taken = self.storage.take_live(id, now)?;
        match &taken {
            Some(_) => tracing::info!(%id, "envelope consumed"),
            None => tracing::debug!(%id, "no live envelope"),
        }
        Ok(taken)
    }

    fn sweep_expired(&self, now: Timestamp) -> Result<usize, StorageError> {
        self.storage.remove_expired(now)
    }
}
