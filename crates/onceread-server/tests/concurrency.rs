//! At-most-once delivery under contention.
//!
//! N callers race `get_and_delete` on the same id, released together by a
//! barrier. Exactly one may win, on every backend.

use std::{
    sync::{Arc, Barrier},
    thread,
    time::Duration,
};

use onceread_core::{EnvelopeDraft, EnvelopeId, Metadata, SecretStore};
use onceread_harness::SimEnv;
use onceread_server::{EphemeralStore, MemoryStorage, RedbStorage, Storage};
use tempfile::tempdir;

const RACERS: usize = 16;

fn draft(n: usize) -> EnvelopeDraft {
    EnvelopeDraft {
        ciphertext: format!("blob-{n}"),
        password_protected: n % 2 == 0,
        metadata: Metadata::Text,
    }
}

/// Race `RACERS` threads on one id; returns how many received the envelope.
fn race_one<S: Storage>(store: &EphemeralStore<SimEnv, S>, id: EnvelopeId) -> usize {
    let barrier = Barrier::new(RACERS);
    thread::scope(|s| {
        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    store.get_and_delete(&id).unwrap().is_some()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).filter(|won| *won).count()
    })
}

#[test]
fn memory_store_hands_out_once() {
    let store = EphemeralStore::new(SimEnv::with_seed(1), MemoryStorage::new());
    for round in 0..20 {
        let id = store.put(draft(round), Duration::from_secs(60)).unwrap();
        assert_eq!(race_one(&store, id), 1, "round {round}");
    }
    assert!(store.storage().is_empty().unwrap());
}

#[test]
fn redb_store_hands_out_once() {
    let dir = tempdir().unwrap();
    let storage = RedbStorage::open(dir.path().join("race.redb")).unwrap();
    let store = EphemeralStore::new(SimEnv::with_seed(2), storage);
    for round in 0..5 {
        let id = store.put(draft(round), Duration::from_secs(60)).unwrap();
        assert_eq!(race_one(&store, id), 1, "round {round}");
    }
    assert!(store.storage().is_empty().unwrap());
}

#[test]
fn unrelated_ids_all_delivered_in_parallel() {
    let store = EphemeralStore::new(SimEnv::with_seed(3), MemoryStorage::new());
    let ids: Vec<_> =
        (0..64).map(|n| store.put(draft(n), Duration::from_secs(60)).unwrap()).collect();

    let barrier = Barrier::new(ids.len());
    let delivered = thread::scope(|s| {
        let handles: Vec<_> = ids
            .iter()
            .map(|id| {
                let (store, barrier) = (&store, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    store.get_and_delete(id).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    });

    for (id, envelope) in ids.iter().zip(&delivered) {
        assert_eq!(envelope.as_ref().map(|e| e.id), Some(*id));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn async_tasks_race_through_shared_store() {
    let store = Arc::new(EphemeralStore::new(SimEnv::with_seed(4), MemoryStorage::new()));
    let id = store.put(draft(0), Duration::from_secs(60)).unwrap();

    let tasks: Vec<_> = (0..RACERS)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.get_and_delete(&id).unwrap().is_some() })
        })
        .collect();

    let mut winners = 0;
    for task in tasks {
        if task.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}
