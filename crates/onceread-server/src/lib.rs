//! onceread server.
//!
//! Production glue around [`onceread_core`]: storage backends, the
//! [`EphemeralStore`] that enforces at-most-once reads and expiry on top of
//! them, and the [`SecretService`] front ends call.
//!
//! # Components
//!
//! - [`Storage`]: backend trait, with [`MemoryStorage`], [`RedbStorage`] and
//!   the fault-injecting [`ChaoticStorage`]
//! - [`EphemeralStore`]: id assignment, expiry stamping, lazy sweeping
//! - [`SecretService`]: validation at the boundary, plus async `seal` and
//!   `reveal` running key derivation on the blocking pool
//! - [`SystemEnv`]: production environment (wall clock, OS RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod service;
pub mod storage;
mod store;
mod system_env;

#[cfg(test)]
mod test_support;

pub use error::ServerError;
pub use service::{DEFAULT_BASE_URL, SecretService, ServiceConfig};
pub use storage::{ChaoticStorage, MemoryStorage, RedbStorage, Storage, StorageError};
pub use store::EphemeralStore;
pub use system_env::SystemEnv;
