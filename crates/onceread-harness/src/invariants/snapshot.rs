//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the store at a point in time, together with the log of
//! every envelope handed out so far. Invariants operate on snapshots rather
//! than live state so checks are consistent.

use onceread_core::{Envelope, EnvelopeId, Timestamp};
use onceread_server::{Storage, StorageError};

/// One envelope handed out by a destructive read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Envelope delivered.
    pub id: EnvelopeId,
    /// Clock reading at the read.
    pub delivered_at: Timestamp,
    /// The envelope's expiry.
    pub expires_at: Timestamp,
}

/// Snapshot of a store plus its delivery history.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    /// Clock reading when the snapshot was taken.
    pub now: Timestamp,
    /// Envelopes still held by the backend (expired-but-unswept included).
    pub stored: Vec<Envelope>,
    /// Every successful destructive read, in order.
    pub deliveries: Vec<Delivery>,
}

impl StoreSnapshot {
    /// Empty snapshot at the epoch.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Peek every id in `known` and record what the backend still holds.
    pub fn capture<S: Storage>(
        storage: &S,
        known: &[EnvelopeId],
        deliveries: &[Delivery],
        now: Timestamp,
    ) -> Result<Self, StorageError> {
        let mut stored = Vec::new();
        for id in known {
            if let Some(envelope) = storage.peek(id)? {
                stored.push(envelope);
            }
        }
        Ok(Self { now, stored, deliveries: deliveries.to_vec() })
    }
}
