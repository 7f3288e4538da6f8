//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::HashSet;

use super::{Invariant, InvariantResult, StoreSnapshot, Violation};

/// No envelope is delivered more than once.
pub struct AtMostOnceDelivery;

impl Invariant for AtMostOnceDelivery {
    fn name(&self) -> &'static str {
        "at_most_once_delivery"
    }

    fn check(&self, state: &StoreSnapshot) -> InvariantResult {
        let mut seen = HashSet::new();
        for delivery in &state.deliveries {
            if !seen.insert(delivery.id) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("envelope {} delivered twice", delivery.id),
                });
            }
        }
        Ok(())
    }
}

/// Every delivery happened strictly before the envelope expired.
pub struct NoExpiredDelivery;

impl Invariant for NoExpiredDelivery {
    fn name(&self) -> &'static str {
        "no_expired_delivery"
    }

    fn check(&self, state: &StoreSnapshot) -> InvariantResult {
        match state.deliveries.iter().find(|d| d.expires_at <= d.delivered_at) {
            Some(d) => Err(Violation {
                invariant: self.name(),
                message: format!(
                    "envelope {} delivered at {} but expired at {}",
                    d.id, d.delivered_at, d.expires_at
                ),
            }),
            None => Ok(()),
        }
    }
}

/// A delivered envelope is gone from the backend.
pub struct DeliveredNotStored;

impl Invariant for DeliveredNotStored {
    fn name(&self) -> &'static str {
        "delivered_not_stored"
    }

    fn check(&self, state: &StoreSnapshot) -> InvariantResult {
        let delivered: HashSet<_> = state.deliveries.iter().map(|d| d.id).collect();
        match state.stored.iter().find(|e| delivered.contains(&e.id)) {
            Some(envelope) => Err(Violation {
                invariant: self.name(),
                message: format!("envelope {} still stored after delivery", envelope.id),
            }),
            None => Ok(()),
        }
    }
}

/// Every stored envelope expires strictly after it was created.
pub struct ExpiryAfterCreation;

impl Invariant for ExpiryAfterCreation {
    fn name(&self) -> &'static str {
        "expiry_after_creation"
    }

    fn check(&self, state: &StoreSnapshot) -> InvariantResult {
        match state.stored.iter().find(|e| e.expires_at <= e.created_at) {
            Some(envelope) => Err(Violation {
                invariant: self.name(),
                message: format!(
                    "envelope {} created at {} expires at {}",
                    envelope.id, envelope.created_at, envelope.expires_at
                ),
            }),
            None => Ok(()),
        }
    }
}
