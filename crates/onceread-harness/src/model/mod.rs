//! Reference model for model-based testing.
//!
//! [`ModelStore`] is a deliberately naive secret store: a flat list with no
//! concurrency, no ids and no backend. Any divergence between it and the real
//! store under the same operation sequence is a bug in the real store.

mod operation;
mod store;

pub use operation::{Operation, OperationError, OperationResult, Slot};
pub use store::{ModelStore, ObservableState};
