//! Deterministic simulation environment.
//!
//! `SimEnv` implements [`Environment`] with a virtual clock that only moves
//! when a test advances it, and a ChaCha20 RNG seeded per run. The same seed
//! yields the same ids, link keys, salts and nonces on every run.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use onceread_core::{Environment, Timestamp};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Virtual clock start (2023-11-14T22:13:20Z), so timestamps look realistic.
pub const SIM_EPOCH: Timestamp = Timestamp::from_millis(1_700_000_000_000);

struct SimState {
    now: Timestamp,
    rng: ChaCha20Rng,
}

/// Simulated environment. Clones share the clock and RNG.
#[derive(Clone)]
pub struct SimEnv {
    state: Arc<Mutex<SimState>>,
}

impl SimEnv {
    /// Environment whose RNG is seeded with `seed`, clock at [`SIM_EPOCH`].
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                now: SIM_EPOCH,
                rng: ChaCha20Rng::seed_from_u64(seed),
            })),
        }
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        state.now = state.now.saturating_add(duration);
        tracing::trace!(now = %state.now, "sim clock advanced");
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // Clock and RNG stay consistent even if a test thread panicked
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Environment for SimEnv {
    fn now(&self) -> Timestamp {
        self.lock().now
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.lock().rng.fill_bytes(buffer);
    }
}
