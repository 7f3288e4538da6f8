//! The store capability the retrieval protocol and service depend on.
//!
//! Passed explicitly, never reached through global state, so tests can swap
//! in a fake with a controllable clock.

use std::{sync::Arc, time::Duration};

use crate::{
    env::Timestamp,
    envelope::{Envelope, EnvelopeDraft, EnvelopeId},
    error::{SecretError, StorageError},
};

/// Holds envelopes with an at-most-once destructive read.
///
/// # Invariants
///
/// - For any id, across all concurrent callers, at most one
///   `get_and_delete` returns the envelope
/// - An envelope whose `expires_at <= now` is never returned, swept or not
/// - Operations on different ids do not serialize on one global lock
pub trait SecretStore: Send + Sync {
    /// Assign a fresh id, stamp `expires_at = now + ttl`, and persist.
    ///
    /// # Errors
    ///
    /// - `Validation` if `ttl` is zero
    /// - `Storage` on backing-store failure
    fn put(&self, draft: EnvelopeDraft, ttl: Duration) -> Result<EnvelopeId, SecretError>;

    /// Whether a live envelope exists. Non-destructive and not a reservation:
    /// a later `get_and_delete` may still find nothing.
    fn exists(&self, id: &EnvelopeId) -> Result<bool, StorageError>;

    /// Atomically remove and return the live envelope at `id`.
    ///
    /// Returns `None` if missing, expired or already consumed.
    fn get_and_delete(&self, id: &EnvelopeId) -> Result<Option<Envelope>, StorageError>;

    /// Remove every envelope with `expires_at <= now`. Returns how many.
    fn sweep_expired(&self, now: Timestamp) -> Result<usize, StorageError>;
}

impl<S: SecretStore + ?Sized> SecretStore for Arc<S> {
    fn put(&self, draft: EnvelopeDraft, ttl: Duration) -> Result<EnvelopeId, SecretError> {
        (**self).put(draft, ttl)
    }

    fn exists(&self, id: &EnvelopeId) -> Result<bool, StorageError> {
        (**self).exists(id)
    }

    fn get_and_delete(&self, id: &EnvelopeId) -> Result<Option<Envelope>, StorageError> {
        (**self).get_and_delete(id)
    }

    fn sweep_expired(&self, now: Timestamp) -> Result<usize, StorageError> {
        (**self).sweep_expired(now)
    }
}
