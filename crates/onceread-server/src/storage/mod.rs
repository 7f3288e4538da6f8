//! Storage backends for envelopes.
//!
//! Trait-based abstraction over where envelopes live. The trait is
//! synchronous (no async): every operation is a short critical section or a
//! single redb transaction, and the async service calls it directly.
//!
//! Backends know nothing about id assignment or lazy sweeping; that policy
//! lives in [`crate::EphemeralStore`]. What backends MUST provide is an
//! atomic [`Storage::take_live`].

mod chaotic;
mod memory;
mod redb;

pub use chaotic::ChaoticStorage;
pub use memory::MemoryStorage;
pub use onceread_core::StorageError;
use onceread_core::{Envelope, EnvelopeId, Timestamp};

pub use self::redb::RedbStorage;

/// Envelope persistence.
///
/// Must be Clone (shared by the store and its clones), Send + Sync
/// (thread-safe), and synchronous. Implementations share internal state via
/// Arc, so clones access the same underlying storage.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Persist a new envelope.
    ///
    /// # Errors
    ///
    /// - `Conflict` if an envelope with the same id is already stored
    ///   (live or not yet swept); nothing is overwritten
    fn insert(&self, envelope: &Envelope) -> Result<(), StorageError>;

    /// Non-destructive read, ignoring expiry.
    fn peek(&self, id: &EnvelopeId) -> Result<Option<Envelope>, StorageError>;

    /// Atomically remove the envelope at `id` and return it if live at `now`.
    ///
    /// # Invariants
    ///
    /// - Check and removal happen in one critical section / transaction: of
    ///   any number of concurrent callers, at most one receives `Some`
    /// - An expired hit is removed and reported as `None`
    fn take_live(&self, id: &EnvelopeId, now: Timestamp)
    -> Result<Option<Envelope>, StorageError>;

    /// Remove every envelope with `expires_at <= now`. Returns how many.
    fn remove_expired(&self, now: Timestamp) -> Result<usize, StorageError>;

    /// Number of stored envelopes, expired-but-unswept included.
    fn len(&self) -> Result<usize, StorageError>;

    /// Whether nothing is stored.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}
