//! Deterministic simulation harness for onceread testing.
//!
//! A seeded [`SimEnv`] with a virtual clock stands in for the wall clock and
//! OS RNG, so expiry and id assignment are reproducible.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference store. Operations are applied to
//! both the model and the real [`onceread_server::EphemeralStore`], and their
//! outcomes and observable states are compared.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks behavioral properties (at-most-once
//! delivery, no expired delivery) against store snapshots. Use
//! [`InvariantRegistry::standard()`] for the common set.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod sim_env;

pub use invariants::{
    AtMostOnceDelivery, DeliveredNotStored, Delivery, ExpiryAfterCreation, Invariant,
    InvariantRegistry, InvariantResult, NoExpiredDelivery, StoreSnapshot, Violation,
};
pub use model::{ModelStore, ObservableState, Operation, OperationError, OperationResult, Slot};
pub use sim_env::{SIM_EPOCH, SimEnv};
