//! Chaotic storage wrapper for fault injection testing
//!
//! Storage wrapper that randomly fails operations to test error handling.
//! Used for chaos testing to ensure a failing backend can lose a secret but
//! never hand it out twice.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use onceread_core::{Envelope, EnvelopeId, Timestamp};

use super::{Storage, StorageError};

/// Chaotic storage wrapper that randomly injects failures
///
/// Delegates to an underlying storage implementation but randomly fails
/// operations based on a configured failure rate. A failed operation never
/// reaches the inner storage. Clone shares the RNG and counter.
#[derive(Clone)]
pub struct ChaoticStorage<S: Storage> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    rng: Arc<Mutex<ChaoticRng>>,
    operation_count: Arc<AtomicUsize>,
    failure_count: Arc<AtomicUsize>,
}

/// Deterministic LCG, so chaos runs are reproducible from a seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: Storage> ChaoticStorage<S> {
    /// Create a new chaotic storage wrapper
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Create with explicit seed for reproducible chaos
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            operation_count: Arc::new(AtomicUsize::new(0)),
            failure_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Underlying storage (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total number of storage operations attempted.
    pub fn operation_count(&self) -> usize {
        self.operation_count.load(Ordering::Relaxed)
    }

    /// Number of operations that were failed by injection.
    pub fn failure_count(&self) -> usize {
        self.failure_count.load(Ordering::Relaxed)
    }

    fn inject(&self) -> Result<(), StorageError> {
        self.operation_count.fetch_add(1, Ordering::Relaxed);

        let fail = match self.rng.lock() {
            Ok(mut rng) => rng.next() < self.failure_rate,
            Err(_) => true,
        };
        if fail {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
            return Err(StorageError::Io("chaotic failure injection".to_string()));
        }
        Ok(())
    }
}

impl<S: Storage> Storage for ChaoticStorage<S> {
    fn insert(&self, envelope: &Envelope) -> Result<(), StorageError> {
        self.inject()?;
        self.inner.insert(envelope)
    }

    fn peek(&self, id: &EnvelopeId) -> Result<Option<Envelope>, StorageError> {
        self.inject()?;
        self.inner.peek(id)
    }

    fn take_live(
        &self,
        id: &EnvelopeId,
        now: Timestamp,
    ) -> Result<Option<Envelope>, StorageError> {
        self.inject()?;
        self.inner.take_live(id, now)
    }

    fn remove_expired(&self, now: Timestamp) -> Result<usize, StorageError> {
        self.inject()?;
        self.inner.remove_expired(now)
    }

    fn len(&self) -> Result<usize, StorageError> {
        self.inner.len()
    }
}
