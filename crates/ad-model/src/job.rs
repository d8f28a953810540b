//! Batch settings, per-item outcomes, and the batch status record.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Options supplied once when a batch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// Lead every ad with a mini-hook when any are available.
    pub use_minihook: bool,

    /// Blend segments with a cross-dissolve instead of hard cuts.
    pub use_transition: bool,
}

/// Lifecycle of the active batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and failed records no longer change.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Where the finished archive lives and how clients fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRef {
    pub path: PathBuf,
    pub download_url: String,
}

/// State of the single active batch, as reported to status pollers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: JobStatus,

    /// Number of combinations in the batch.
    pub total: usize,

    /// Items finished so far, failed ones included.
    pub completed: usize,

    /// Append-only event log.
    pub log: Vec<String>,

    /// Set once the batch completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<ArchiveRef>,

    /// Set when the batch fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// RFC 3339 start time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,

    /// RFC 3339 end time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

impl StatusRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the previous batch and enter `Running` with an empty log.
    pub fn reset_for_batch(&mut self) {
        *self = Self {
            status: JobStatus::Running,
            started_at: Some(now_rfc3339()),
            ..Self::default()
        };
    }

    /// Publish the batch size before the first item renders.
    pub fn begin(&mut self, total: usize) {
        if self.status != JobStatus::Running {
            return;
        }
        self.total = total;
        self.completed = 0;
    }

    /// Append a log line without advancing progress.
    pub fn note(&mut self, line: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.log.push(line.into());
    }

    /// Record one finished item, successful or not.
    pub fn record_item(&mut self, line: impl Into<String>) {
        if self.status != JobStatus::Running {
            return;
        }
        self.completed += 1;
        self.log.push(line.into());
    }

    pub fn complete(&mut self, archive: ArchiveRef) {
        if self.status != JobStatus::Running {
            return;
        }
        self.log
            .push(format!("Archive ready: {}", archive.download_url));
        self.archive = Some(archive);
        self.status = JobStatus::Completed;
        self.finished_at = Some(now_rfc3339());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        let message = message.into();
        self.log.push(format!("Error: {message}"));
        self.error = Some(message);
        self.status = JobStatus::Failed;
        self.finished_at = Some(now_rfc3339());
    }

    /// Progress in `[0.0, 1.0]`.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return if self.status == JobStatus::Completed {
                1.0
            } else {
                0.0
            };
        }
        (self.completed as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Result of rendering one combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RenderOutcome {
    Success { sequence: usize, path: PathBuf },
    Failure { sequence: usize, reason: String },
}

impl RenderOutcome {
    pub fn sequence(&self) -> usize {
        match self {
            RenderOutcome::Success { sequence, .. } | RenderOutcome::Failure { sequence, .. } => {
                *sequence
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RenderOutcome::Success { .. })
    }
}

/// Every item outcome of one batch, in enumeration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<RenderOutcome>,

    /// The batch stopped early on request.
    pub cancelled: bool,
}

impl BatchReport {
    pub fn push(&mut self, outcome: RenderOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.successes()
    }

    /// Output files of successful items.
    pub fn success_paths(&self) -> Vec<PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                RenderOutcome::Success { path, .. } => Some(path.clone()),
                RenderOutcome::Failure { .. } => None,
            })
            .collect()
    }
}
