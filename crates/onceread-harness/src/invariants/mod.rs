//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties that must always hold during system execution.
//! Unlike example-based tests that check specific scenarios, invariants
//! verify behavioral properties across all possible execution paths.
//!
//! # Architecture
//!
//! A test records every successful destructive read as a [`Delivery`], then
//! captures the backend into a [`StoreSnapshot`] and runs registered
//! [`Invariant`] checks against it.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = StoreSnapshot::capture(&storage, &ids, &deliveries, env.now())?;
//! registry.assert_all(&snapshot, "after step 12");
//! ```

mod checks;
mod snapshot;

pub use checks::{AtMostOnceDelivery, DeliveredNotStored, ExpiryAfterCreation, NoExpiredDelivery};
pub use snapshot::{Delivery, StoreSnapshot};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against store state.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against a snapshot.
    fn check(&self, state: &StoreSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the standard store invariants.
    ///
    /// Includes:
    /// - [`AtMostOnceDelivery`]: no id is handed out twice
    /// - [`NoExpiredDelivery`]: nothing is handed out at or after expiry
    /// - [`DeliveredNotStored`]: a delivered envelope is gone
    /// - [`ExpiryAfterCreation`]: stored envelopes have a positive lifetime
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(AtMostOnceDelivery);
        registry.add(NoExpiredDelivery);
        registry.add(DeliveredNotStored);
        registry.add(ExpiryAfterCreation);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &StoreSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking on any violation.
    ///
    /// Use this in tests where you want immediate failure with context.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &StoreSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use onceread_core::{Envelope, EnvelopeId, Metadata, Timestamp};

    use super::*;

    fn delivery(seed: u8, delivered_at: u64, expires_at: u64) -> Delivery {
        Delivery {
            id: EnvelopeId::from_random_bytes([seed; 16]),
            delivered_at: Timestamp::from_millis(delivered_at),
            expires_at: Timestamp::from_millis(expires_at),
        }
    }

    #[test]
    fn standard_registry_has_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn empty_snapshot_passes_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(registry.check_all(&StoreSnapshot::empty()).is_ok());
    }

    #[test]
    fn double_delivery_detected() {
        let snapshot = StoreSnapshot {
            deliveries: vec![delivery(1, 0, 10), delivery(1, 1, 10)],
            ..StoreSnapshot::empty()
        };
        let violations = InvariantRegistry::standard().check_all(&snapshot).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].invariant, "at_most_once_delivery");
    }

    #[test]
    fn delivery_at_expiry_detected() {
        let snapshot =
            StoreSnapshot { deliveries: vec![delivery(2, 10, 10)], ..StoreSnapshot::empty() };
        let violations = InvariantRegistry::standard().check_all(&snapshot).unwrap_err();
        assert_eq!(violations[0].invariant, "no_expired_delivery");
    }

    #[test]
    fn delivered_but_stored_detected() {
        let d = delivery(3, 0, 10);
        let envelope = Envelope {
            id: d.id,
            ciphertext: String::new(),
            created_at: Timestamp::from_millis(0),
            expires_at: d.expires_at,
            password_protected: false,
            metadata: Metadata::Text,
        };
        let snapshot =
            StoreSnapshot { stored: vec![envelope], deliveries: vec![d], ..StoreSnapshot::empty() };
        let violations = InvariantRegistry::standard().check_all(&snapshot).unwrap_err();
        assert_eq!(violations[0].invariant, "delivered_not_stored");
    }
}
