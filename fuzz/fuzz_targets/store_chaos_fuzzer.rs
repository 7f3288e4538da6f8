//! Fuzz target for the ephemeral store under storage failures
//!
//! Drives an `EphemeralStore` over `ChaoticStorage` with arbitrary operation
//! sequences and checks the standard invariants against the inner backend.
//!
//! # Invariants
//!
//! - A secret is handed out at most once
//! - No secret is handed out at or after its expiry
//! - A handed-out secret is gone from storage
//! - Failures surface as `Err`, never as panics

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use onceread_core::{EnvelopeDraft, EnvelopeId, Environment, Metadata, SecretStore};
use onceread_harness::{Delivery, InvariantRegistry, Operation, SimEnv, StoreSnapshot};
use onceread_server::{ChaoticStorage, EphemeralStore, MemoryStorage};

#[derive(Debug, Arbitrary)]
struct ChaosScenario {
    /// Seed for the simulated clock and id generation
    seed: u64,
    /// Seed for ChaoticStorage RNG (deterministic failures)
    chaos_seed: u64,
    /// Failure rate 0-9 maps to 0%-90%
    failure_rate_tenth: u8,
    operations: Vec<Operation>,
}

fuzz_target!(|scenario: ChaosScenario| {
    let failure_rate = f64::from(scenario.failure_rate_tenth % 10) / 10.0;
    let storage =
        ChaoticStorage::with_seed(MemoryStorage::new(), failure_rate, scenario.chaos_seed);
    let env = SimEnv::with_seed(scenario.seed);
    let store = EphemeralStore::new(env.clone(), storage);

    let mut ids: Vec<EnvelopeId> = Vec::new();
    let mut deliveries = Vec::new();
    let take = |id: &EnvelopeId, deliveries: &mut Vec<Delivery>| {
        if let Ok(Some(envelope)) = store.get_and_delete(id) {
            deliveries.push(Delivery {
                id: envelope.id,
                delivered_at: env.now(),
                expires_at: envelope.expires_at,
            });
        }
    };

    for op in scenario.operations.iter().take(256) {
        match *op {
            Operation::Put { ttl_millis, password_protected } => {
                let draft = EnvelopeDraft {
                    ciphertext: format!("blob-{}", ids.len()),
                    password_protected,
                    metadata: Metadata::Text,
                };
                if let Ok(id) = store.put(draft, Duration::from_millis(u64::from(ttl_millis))) {
                    ids.push(id);
                }
            },
            Operation::Take { slot } if !ids.is_empty() => {
                let id = ids[usize::from(slot) % ids.len()];
                take(&id, &mut deliveries);
            },
            Operation::TakeUnknown => {
                let id = EnvelopeId::generate(&env);
                take(&id, &mut deliveries);
            },
            Operation::Exists { slot } if !ids.is_empty() => {
                let _ = store.exists(&ids[usize::from(slot) % ids.len()]);
            },
            Operation::AdvanceTime { millis } => {
                env.advance(Duration::from_millis(u64::from(millis)));
            },
            Operation::Sweep => {
                let _ = store.sweep_expired(env.now());
            },
            Operation::Take { .. } | Operation::Exists { .. } => {},
        }
    }

    let inner = store.storage().inner();
    let Ok(snapshot) = StoreSnapshot::capture(inner, &ids, &deliveries, env.now()) else {
        return;
    };
    InvariantRegistry::standard().assert_all(&snapshot, "after chaos run");
});
