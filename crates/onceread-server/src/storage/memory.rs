use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use onceread_core::{Envelope, EnvelopeId, Timestamp};

use super::{Storage, StorageError};

/// Number of independently locked shards.
const SHARDS: usize = 16;

/// In-memory storage, sharded by id.
///
/// Each shard is a `HashMap` behind its own `Mutex`, so operations on
/// unrelated ids rarely contend. Clone shares the shards (Arc). A poisoned
/// shard lock surfaces as `StorageError::Io` rather than a panic.
#[derive(Clone)]
pub struct MemoryStorage {
    shards: Arc<[Mutex<HashMap<EnvelopeId, Envelope>>; SHARDS]>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// Create a new empty `MemoryStorage`.
    pub fn new() -> Self {
        Self { shards: Arc::new(std::array::from_fn(|_| Mutex::new(HashMap::new()))) }
    }

    fn shard(
        &self,
        id: &EnvelopeId,
    ) -> Result<MutexGuard<'_, HashMap<EnvelopeId, Envelope>>, StorageError> {
        // Ids are random, so the low nibble of the first byte spreads evenly
        let index = usize::from(id.as_bytes()[0]) % SHARDS;
        lock(&self.shards[index])
    }
}

fn lock(
    shard: &Mutex<HashMap<EnvelopeId, Envelope>>,
) -> Result<MutexGuard<'_, HashMap<EnvelopeId, Envelope>>, StorageError> {
    shard.lock().map_err(|_| StorageError::Io("memory shard lock poisoned".to_string()))
}

impl Storage for MemoryStorage {
    fn insert(&self, envelope: &Envelope) -> Result<(), StorageError> {
        let mut shard = self.shard(&envelope.id)?;
        if shard.contains_key(&envelope.id) {
            return Err(StorageError::Conflict(envelope.id));
        }
        shard.insert(envelope.id, envelope.clone());
        Ok(())
    }

    fn peek(&self, id: &EnvelopeId) -> Result<Option<Envelope>, StorageError> {
        Ok(self.shard(id)?.get(id).cloned())
    }

    fn take_live(
        &self,
        id: &EnvelopeId,
        now: Timestamp,
    ) -> Result<Option<Envelope>, StorageError> {
        let removed = self.shard(id)?.remove(id);
        Ok(removed.filter(|envelope| envelope.is_live_at(now)))
    }

    fn remove_expired(&self, now: Timestamp) -> Result<usize, StorageError> {
        let mut removed = 0;
        for shard in self.shards.iter() {
            let mut shard = lock(shard)?;
            let before = shard.len();
            shard.retain(|_, envelope| envelope.is_live_at(now));
            removed += before - shard.len();
        }
        Ok(removed)
    }

    fn len(&self) -> Result<usize, StorageError> {
        self.shards.iter().try_fold(0, |total, shard| Ok(total + lock(shard)?.len()))
    }
}
