//! In-crate fakes for unit tests.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use crate::{
    env::{Environment, Timestamp},
    envelope::{Envelope, EnvelopeDraft, EnvelopeId},
    error::{SecretError, StorageError},
    store::SecretStore,
};

/// Fixed clock, counter-driven bytes. Not random, only distinct.
#[derive(Clone, Default)]
pub struct CountingEnv {
    counter: Arc<AtomicU64>,
}

impl Environment for CountingEnv {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(1_000)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        for chunk in buffer.chunks_mut(8) {
            let next = self.counter.fetch_add(1, Ordering::Relaxed).to_le_bytes();
            chunk.copy_from_slice(&next[..chunk.len()]);
        }
    }
}

/// Single-mutex store that counts destructive fetches.
#[derive(Default)]
pub struct FakeStore {
    env: CountingEnv,
    envelopes: Mutex<HashMap<EnvelopeId, Envelope>>,
    fetches: AtomicU64,
    fail_next: AtomicBool,
}

impl FakeStore {
    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn fail_next_fetch(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl SecretStore for FakeStore {
    fn put(&self, draft: EnvelopeDraft, ttl: Duration) -> Result<EnvelopeId, SecretError> {
        let id = EnvelopeId::generate(&self.env);
        let envelope = Envelope::from_draft(id, draft, self.env.now(), ttl);
        self.envelopes.lock().unwrap().insert(id, envelope);
        Ok(id)
    }

    fn exists(&self, id: &EnvelopeId) -> Result<bool, StorageError> {
        Ok(self.envelopes.lock().unwrap().contains_key(id))
    }

    fn get_and_delete(&self, id: &EnvelopeId) -> Result<Option<Envelope>, StorageError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Io("injected".into()));
        }
        Ok(self.envelopes.lock().unwrap().remove(id))
    }

    fn sweep_expired(&self, now: Timestamp) -> Result<usize, StorageError> {
        let mut envelopes = self.envelopes.lock().unwrap();
        let before = envelopes.len();
        envelopes.retain(|_, envelope| envelope.is_live_at(now));
        Ok(before - envelopes.len())
    }
}
