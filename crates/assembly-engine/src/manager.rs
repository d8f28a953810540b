//! Single-slot job control: one batch at a time, pollable status.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;

use hookreel_common::error::{HookreelError, HookreelResult};
use hookreel_model::{BatchReport, JobSettings, JobStatus, StatusRecord};

use crate::cancel::CancelFlag;
use crate::orchestrator::BatchRunner;
use crate::status::StatusHandle;

/// Owns the status slot and the cancel flag of the batch in flight.
pub struct JobManager {
    runner: Arc<BatchRunner>,
    status: StatusHandle,
    cancel: Mutex<CancelFlag>,
}

impl JobManager {
    pub fn new(runner: Arc<BatchRunner>) -> Self {
        Self {
            runner,
            status: StatusHandle::new(),
            cancel: Mutex::new(CancelFlag::new()),
        }
    }

    pub fn status(&self) -> StatusRecord {
        self.status.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.status.snapshot().status == JobStatus::Running
    }

    /// Start a batch on the blocking pool.
    ///
    /// Returns [`HookreelError::JobConflict`] while another batch is running;
    /// the running batch is left untouched. Must be called from within a
    /// tokio runtime.
    pub fn start(&self, settings: JobSettings) -> HookreelResult<JoinHandle<BatchReport>> {
        // Lock order: cancel slot, then status. `cancel()` takes them the same way.
        let mut slot = self.cancel_slot();
        let accepted = self.status.update(|record| {
            if record.status == JobStatus::Running {
                return false;
            }
            record.reset_for_batch();
            true
        });
        if !accepted {
            tracing::warn!("Start rejected: a batch is already running");
            return Err(HookreelError::JobConflict);
        }

        let cancel = CancelFlag::new();
        *slot = cancel.clone();
        drop(slot);

        let runner = self.runner.clone();
        let status = self.status.clone();
        Ok(tokio::task::spawn_blocking(move || {
            match catch_unwind(AssertUnwindSafe(|| runner.run(settings, &status, &cancel))) {
                Ok(report) => report,
                Err(_) => {
                    tracing::error!("Batch worker panicked");
                    status.update(|r| r.fail("Internal error: batch worker panicked"));
                    BatchReport::default()
                }
            }
        }))
    }

    /// Request cancellation of the running batch. Returns whether a batch was
    /// running to receive it.
    pub fn cancel(&self) -> bool {
        let slot = self.cancel_slot();
        if !self.is_running() {
            return false;
        }
        tracing::info!("Cancellation requested");
        slot.cancel();
        true
    }

    fn cancel_slot(&self) -> MutexGuard<'_, CancelFlag> {
        self.cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
