//! Operations for model-based testing.
//!
//! Operations represent every store-facing action. They are generated
//! randomly and applied to both the model and the real store.

use arbitrary::Arbitrary;

/// Index into the ids created so far (taken modulo their count).
pub type Slot = u8;

/// Operations that can be applied to a secret store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Store a new secret.
    Put {
        /// Lifetime in milliseconds; zero is rejected.
        ttl_millis: u16,
        /// Whether it is password protected.
        password_protected: bool,
    },

    /// Destructively read a previously created secret.
    Take {
        /// Which created secret.
        slot: Slot,
    },

    /// Destructively read an id that was never created.
    TakeUnknown,

    /// Non-destructive availability check.
    Exists {
        /// Which created secret.
        slot: Slot,
    },

    /// Advance simulation time.
    AdvanceTime {
        /// Milliseconds to advance.
        millis: u16,
    },

    /// Explicit sweep of expired secrets.
    Sweep,
}

/// Observable outcome of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    /// Secret stored; its index among created secrets.
    Stored(usize),
    /// Destructive read: index of the secret handed out, or nothing.
    Taken(Option<usize>),
    /// Availability check outcome.
    Exists(bool),
    /// Number of expired secrets removed.
    Swept(usize),
    /// Clock moved.
    Advanced,
    /// Operation was a no-op (no secrets created yet).
    Skipped,
    /// Operation rejected.
    Error(OperationError),
}

/// Reasons an operation is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// Zero time-to-live.
    InvalidTtl,
    /// Backing store failed.
    Storage,
}
