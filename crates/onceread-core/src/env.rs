//! Environment abstraction for deterministic testing.
//!
//! Decouples store and composition logic from system resources (wall clock,
//! randomness). Production wires in the OS clock and CSPRNG; simulation uses
//! a manually advanced clock and a seeded RNG so expiry and id assignment are
//! reproducible.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Wall-clock instant in unix milliseconds.
///
/// Envelope timestamps are persisted and transmitted, so this is an absolute
/// time rather than a monotonic `Instant`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch.
    pub const EPOCH: Self = Self(0);

    /// Timestamp from unix milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Unix milliseconds.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// `self + duration`, clamped at `u64::MAX` milliseconds.
    pub fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration_millis(duration)))
    }

    /// `self - duration`, clamped at the epoch.
    pub fn saturating_sub(self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration_millis(duration)))
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Whole milliseconds in `duration`, clamped to `u64`.
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Abstract environment providing wall-clock time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses cryptographically secure entropy in production
///   (link keys, salts and nonces are drawn from it)
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time.
    ///
    /// # Invariants
    ///
    /// - Subsequent calls return times >= previous calls.
    fn now(&self) -> Timestamp;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a fixed-size random array (ids, salts, nonces, link keys).
    fn random_array<const N: usize>(&self) -> [u8; N] {
        let mut bytes = [0u8; N];
        self.random_bytes(&mut bytes);
        bytes
    }
}
