//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` is the production implementation of the Environment trait using
//! the wall clock and the OS cryptographic RNG. Envelope timestamps are
//! persisted, so time comes from `SystemTime` rather than a monotonic clock.
//! Readings are clamped so a wall clock stepped backwards never moves `now`
//! backwards.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use onceread_core::{Environment, Timestamp, env::duration_millis};

/// Production environment using system time and cryptographic RNG.
///
/// # Security
///
/// The RNG uses getrandom which provides OS-level cryptographic randomness
/// (e.g., /dev/urandom on Linux, `BCryptGenRandom` on Windows). Link keys,
/// salts, nonces and envelope ids all come from it.
///
/// # Panics
///
/// Panics if the OS RNG fails. A secret sealed without functioning
/// cryptographic randomness would be guessable.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv {
    /// Highest reading handed out so far, shared by clones
    last: Arc<AtomicU64>,
}

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamp a raw reading to at least every earlier one.
    fn monotonic(&self, millis: u64) -> Timestamp {
        let previous = self.last.fetch_max(millis, Ordering::AcqRel);
        Timestamp::from_millis(previous.max(millis))
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Timestamp {
        // A clock before 1970 reads as the epoch, which only shortens lifetimes
        let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        self.monotonic(duration_millis(since_epoch))
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - secrets cannot be sealed");
    }
}
