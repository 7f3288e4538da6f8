//! Shared fixtures for unit tests.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use onceread_core::{Environment, Timestamp};

/// Clock under test control, entropy from a counter (optionally stuck).
#[derive(Clone, Default)]
pub(crate) struct TestEnv {
    now: Arc<AtomicU64>,
    counter: Arc<AtomicU64>,
    stuck: bool,
}

impl TestEnv {
    /// Every `random_bytes` call returns the same bytes.
    pub(crate) fn stuck() -> Self {
        Self { stuck: true, ..Self::default() }
    }

    pub(crate) fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Environment for TestEnv {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now.load(Ordering::SeqCst))
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        let n = if self.stuck { 0 } else { self.counter.fetch_add(1, Ordering::SeqCst) + 1 };
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = n.to_le_bytes()[i % 8] ^ (i as u8);
        }
    }
}
