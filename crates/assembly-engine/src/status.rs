//! Shared handle to the batch status record.

use std::sync::{Arc, Mutex, MutexGuard};

use hookreel_model::StatusRecord;

/// Mutex-guarded status record.
///
/// The orchestrator is the only writer once a batch runs; any number of
/// pollers may take snapshots concurrently.
#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    inner: Arc<Mutex<StatusRecord>>,
}

impl StatusHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` under the lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut StatusRecord) -> R) -> R {
        f(&mut self.lock())
    }

    /// Point-in-time copy for status queries.
    pub fn snapshot(&self) -> StatusRecord {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, StatusRecord> {
        // A panicking writer leaves the record in a consistent state: every
        // mutation is a single method call on StatusRecord.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
