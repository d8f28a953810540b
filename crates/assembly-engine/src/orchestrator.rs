//! Sequential batch driver.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use hookreel_common::config::{AppConfig, AssemblyLimits, EncodingConfig, StorageConfig};
use hookreel_common::error::{HookreelError, HookreelResult};
use hookreel_model::{BatchReport, Combination, JobSettings, RenderOutcome};

use crate::archive::ArchivePackager;
use crate::cancel::CancelFlag;
use crate::enumerate::Combinations;
use crate::graph::{GraphBuilder, JoinMode};
use crate::inventory::SegmentInventory;
use crate::invoker::{FfmpegTranscoder, FfprobeProbe, TranscodeRequest, Transcoder};
use crate::status::StatusHandle;
use crate::transition::{DurationProbe, TransitionPlanner};

/// Fold numbered combinations into a [`BatchReport`].
///
/// Each item's error becomes a [`RenderOutcome::Failure`] and iteration
/// continues. `on_outcome` runs after every item. Cancellation is checked
/// before each item; an item that fails with [`HookreelError::Cancelled`]
/// also stops the batch. A cancelled batch reports the items attempted so far.
pub fn render_batch<I, F, G>(
    items: I,
    cancel: &CancelFlag,
    mut render: F,
    mut on_outcome: G,
) -> BatchReport
where
    I: IntoIterator<Item = (usize, Combination)>,
    F: FnMut(usize, &Combination) -> HookreelResult<PathBuf>,
    G: FnMut(&RenderOutcome, &Combination),
{
    let mut report = BatchReport::default();
    for (sequence, combination) in items {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        let (outcome, interrupted) = match render(sequence, &combination) {
            Ok(path) => (RenderOutcome::Success { sequence, path }, false),
            Err(e) => {
                let interrupted = matches!(e, HookreelError::Cancelled);
                let reason = e.to_string();
                (RenderOutcome::Failure { sequence, reason }, interrupted)
            }
        };
        on_outcome(&outcome, &combination);
        report.push(outcome);

        if interrupted {
            report.cancelled = true;
            break;
        }
    }
    report
}

/// Drives one batch from inventory to archive, reporting through a
/// [`StatusHandle`].
pub struct BatchRunner {
    storage: StorageConfig,
    limits: AssemblyLimits,
    encoding: EncodingConfig,
    archive: ArchivePackager,
    transcoder: Arc<dyn Transcoder>,
    probe: Arc<dyn DurationProbe>,
}

impl BatchRunner {
    pub fn new(
        config: &AppConfig,
        transcoder: Arc<dyn Transcoder>,
        probe: Arc<dyn DurationProbe>,
    ) -> Self {
        Self {
            storage: config.storage.clone(),
            limits: config.limits,
            encoding: config.encoding.clone(),
            archive: ArchivePackager::new(&config.storage.output_dir, config.archive.clone()),
            transcoder,
            probe,
        }
    }

    /// Runner backed by the configured ffmpeg and ffprobe binaries.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config,
            Arc::new(FfmpegTranscoder::from_config(config)),
            Arc::new(FfprobeProbe::from_config(config)),
        )
    }

    pub fn transcoder(&self) -> &dyn Transcoder {
        self.transcoder.as_ref()
    }

    /// A planner sharing this runner's probe, with an empty duration cache.
    pub fn planner(&self) -> TransitionPlanner {
        TransitionPlanner::new(self.encoding.transition_secs, self.probe.clone())
    }

    /// Run a whole batch. Never fails: every outcome lands in `status`.
    pub fn run(
        &self,
        settings: JobSettings,
        status: &StatusHandle,
        cancel: &CancelFlag,
    ) -> BatchReport {
        let started = Instant::now();
        status.update(|r| r.reset_for_batch());
        tracing::info!(
            use_minihook = settings.use_minihook,
            use_transition = settings.use_transition,
            "Starting ad batch"
        );

        let inventory = match SegmentInventory::discover(&self.storage, &self.limits, &settings) {
            Ok(inventory) => inventory,
            Err(e) => {
                tracing::error!(error = %e, "Batch precondition failed");
                status.update(|r| r.fail(e.to_string()));
                return BatchReport::default();
            }
        };

        let combinations = Combinations::new(&inventory);
        let total = combinations.total();
        status.update(|r| {
            r.begin(total);
            for note in inventory.notes() {
                r.note(note.clone());
            }
        });
        tracing::info!(total, "Combinations enumerated");

        if let Err(e) = std::fs::create_dir_all(&self.storage.output_dir) {
            tracing::error!(error = %e, dir = %self.storage.output_dir.display(), "Cannot create output directory");
            status.update(|r| r.fail(format!("Failed to create output directory: {e}")));
            return BatchReport::default();
        }

        if !self.transcoder.is_available() {
            tracing::warn!(
                backend = self.transcoder.name(),
                "Render backend not available; items will fail"
            );
        }

        let mut planner = self.planner();
        let report = render_batch(
            combinations.enumerate().map(|(idx, c)| (idx + 1, c)),
            cancel,
            |sequence, combination| {
                let request = self.prepare(sequence, combination, &settings, &mut planner)?;
                self.transcoder.transcode(&request, cancel)?;
                Ok(request.output_path)
            },
            |outcome, combination| {
                let name = combination.output_name(outcome.sequence(), &self.encoding.output_extension);
                let line = match outcome {
                    RenderOutcome::Success { sequence, .. } => {
                        tracing::info!(sequence, total, output = %name, "Item rendered");
                        format!("[{sequence}/{total}] Generated: {name}")
                    }
                    RenderOutcome::Failure { sequence, reason } => {
                        tracing::warn!(sequence, total, output = %name, reason = %reason, "Item failed");
                        format!("[{sequence}/{total}] Error on {name}: {reason}")
                    }
                };
                status.update(|r| r.record_item(line));
            },
        );

        if report.cancelled {
            let message = format!(
                "Batch cancelled after {} of {total} items",
                report.outcomes.len()
            );
            tracing::warn!(attempted = report.outcomes.len(), total, "Batch cancelled");
            status.update(|r| r.fail(message));
            return report;
        }

        match self.archive.package(&report.success_paths()) {
            Ok(archive) => {
                tracing::info!(
                    successes = report.successes(),
                    failures = report.failures(),
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Batch completed"
                );
                status.update(|r| r.complete(archive));
            }
            Err(e) => {
                tracing::error!(error = %e, "Archiving failed");
                status.update(|r| r.fail(e.to_string()));
            }
        }
        report
    }

    /// Build the render request for one numbered combination.
    pub fn prepare(
        &self,
        sequence: usize,
        combination: &Combination,
        settings: &JobSettings,
        planner: &mut TransitionPlanner,
    ) -> HookreelResult<TranscodeRequest> {
        let builder = GraphBuilder::from_encoding(&self.encoding);
        let graph = if settings.use_transition {
            let plan = planner.plan(combination)?;
            builder.build(combination.len(), JoinMode::Blend(&plan))?
        } else {
            builder.build(combination.len(), JoinMode::Cut)?
        };

        let output_path = self.storage.output_dir.join(
            combination.output_name(sequence, &self.encoding.output_extension),
        );
        Ok(TranscodeRequest {
            inputs: combination.inputs(),
            graph,
            output_path,
        })
    }
}
