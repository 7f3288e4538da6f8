//! Model store - the reference implementation.

use super::operation::{Operation, OperationError, OperationResult, Slot};

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Indices of created secrets still held by the store (live or not yet
    /// swept), ascending.
    pub stored: Vec<usize>,
    /// Indices of created secrets `exists` would report, ascending.
    pub live: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
struct ModelEntry {
    expires_at: u64,
    stored: bool,
}

/// Model secret store over a virtual millisecond clock.
#[derive(Debug, Clone, Default)]
pub struct ModelStore {
    now: u64,
    entries: Vec<ModelEntry>,
}

impl ModelStore {
    /// Empty store at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of secrets created so far.
    pub fn created(&self) -> usize {
        self.entries.len()
    }

    /// Map a slot onto a created secret, if any exist.
    pub fn resolve(&self, slot: Slot) -> Option<usize> {
        (!self.entries.is_empty()).then(|| usize::from(slot) % self.entries.len())
    }

    /// Apply an operation and report its observable outcome.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match *op {
            Operation::Put { ttl_millis, .. } => {
                if ttl_millis == 0 {
                    return OperationResult::Error(OperationError::InvalidTtl);
                }
                self.sweep();
                self.entries.push(ModelEntry {
                    expires_at: self.now + u64::from(ttl_millis),
                    stored: true,
                });
                OperationResult::Stored(self.entries.len() - 1)
            },
            Operation::Take { slot } => {
                let Some(index) = self.resolve(slot) else {
                    return OperationResult::Skipped;
                };
                self.sweep();
                let entry = &mut self.entries[index];
                if entry.stored {
                    entry.stored = false;
                    OperationResult::Taken(Some(index))
                } else {
                    OperationResult::Taken(None)
                }
            },
            Operation::TakeUnknown => {
                self.sweep();
                OperationResult::Taken(None)
            },
            Operation::Exists { slot } => match self.resolve(slot) {
                Some(index) => OperationResult::Exists(self.is_live(index)),
                None => OperationResult::Skipped,
            },
            Operation::AdvanceTime { millis } => {
                self.now += u64::from(millis);
                OperationResult::Advanced
            },
            Operation::Sweep => OperationResult::Swept(self.sweep()),
        }
    }

    /// Observable state for comparison with the real store.
    pub fn observable_state(&self) -> ObservableState {
        let stored = (0..self.entries.len()).filter(|&i| self.entries[i].stored).collect();
        let live = (0..self.entries.len()).filter(|&i| self.is_live(i)).collect();
        ObservableState { stored, live }
    }

    fn is_live(&self, index: usize) -> bool {
        let entry = self.entries[index];
        entry.stored && entry.expires_at > self.now
    }

    fn sweep(&mut self) -> usize {
        let now = self.now;
        let mut removed = 0;
        for entry in self.entries.iter_mut().filter(|e| e.stored && e.expires_at <= now) {
            entry.stored = false;
            removed += 1;
        }
        removed
    }
}
