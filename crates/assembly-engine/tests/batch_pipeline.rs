use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hookreel_assembly::{
    BatchRunner, CancelFlag, DurationProbe, JobManager, StatusHandle, TranscodeRequest, Transcoder,
};
use hookreel_common::config::{AppConfig, StorageConfig};
use hookreel_common::error::{HookreelError, HookreelResult};
use hookreel_model::{JobSettings, JobStatus};

/// Writes the filter graph into the output file instead of rendering.
#[derive(Default)]
struct RecordingTranscoder {
    fail_sequences: HashSet<usize>,
    cancel_at: Option<usize>,
    gate: Option<Arc<AtomicBool>>,
    graphs: Mutex<Vec<String>>,
}

impl RecordingTranscoder {
    fn failing(sequences: &[usize]) -> Self {
        Self {
            fail_sequences: sequences.iter().copied().collect(),
            ..Self::default()
        }
    }
}

fn sequence_of(path: &Path) -> usize {
    let name = path.file_name().unwrap().to_str().unwrap();
    name.trim_start_matches("AD")
        .split('-')
        .next()
        .unwrap()
        .parse()
        .unwrap()
}

impl Transcoder for RecordingTranscoder {
    fn transcode(&self, request: &TranscodeRequest, cancel: &CancelFlag) -> HookreelResult<()> {
        if let Some(gate) = &self.gate {
            for _ in 0..500 {
                if gate.load(Ordering::SeqCst) {
                    break;
                }
                std::thread::sleep(Duration::from_millis(10));
            }
        }

        let sequence = sequence_of(&request.output_path);
        if self.fail_sequences.contains(&sequence) {
            return Err(HookreelError::transcode("exit status: 1"));
        }

        let graph = request.graph.to_filter_complex();
        std::fs::write(&request.output_path, graph.as_bytes())?;
        self.graphs.lock().unwrap().push(graph);

        if self.cancel_at == Some(sequence) {
            cancel.cancel();
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "recording"
    }
}

struct FixedProbe(f64);

impl DurationProbe for FixedProbe {
    fn probe_duration(&self, _path: &Path) -> HookreelResult<f64> {
        Ok(self.0)
    }
}

struct Workspace {
    root: PathBuf,
    config: AppConfig,
}

impl Workspace {
    fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!(
            "hookreel_test_pipeline_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&root);
        let config = AppConfig {
            storage: StorageConfig::rooted_at(&root),
            ..AppConfig::default()
        };
        Self { root, config }
    }

    fn upload(&self, dir: &str, files: &[&str]) {
        let dir = self.config.storage.uploads_dir.join(dir);
        std::fs::create_dir_all(&dir).unwrap();
        for file in files {
            std::fs::write(dir.join(file), b"segment").unwrap();
        }
    }

    /// hooks {A, B}, bodies {C}, ctas {D}.
    fn scenario(name: &str) -> Self {
        let ws = Self::new(name);
        ws.upload("hooks", &["A.mp4", "B.mp4"]);
        ws.upload("bodies", &["C.mp4"]);
        ws.upload("ctas", &["D.mp4"]);
        ws
    }

    fn output(&self) -> &Path {
        &self.config.storage.output_dir
    }

    fn runner(&self, transcoder: Arc<RecordingTranscoder>) -> BatchRunner {
        BatchRunner::new(&self.config, transcoder, Arc::new(FixedProbe(2.0)))
    }

    fn rendered(&self) -> Vec<String> {
        let mut names: Vec<String> = match std::fs::read_dir(self.output()) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|n| n.starts_with("AD"))
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    fn archive_entries(&self) -> Vec<String> {
        let file = File::open(self.output().join("all_ads.zip")).unwrap();
        let archive = zip::ZipArchive::new(file).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

fn cut() -> JobSettings {
    JobSettings {
        use_minihook: false,
        use_transition: false,
    }
}

#[test]
fn cut_batch_renders_every_combination_and_archives_them() {
    let ws = Workspace::scenario("cut");
    let transcoder = Arc::new(RecordingTranscoder::default());
    let status = StatusHandle::new();

    let report = ws
        .runner(transcoder.clone())
        .run(cut(), &status, &CancelFlag::new());

    assert_eq!(report.successes(), 2);
    assert_eq!(ws.rendered(), vec!["AD1-A-C-D.mp4", "AD2-B-C-D.mp4"]);
    assert_eq!(ws.archive_entries(), vec!["AD1-A-C-D.mp4", "AD2-B-C-D.mp4"]);

    let record = status.snapshot();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.total, 2);
    assert_eq!(record.completed, 2);
    assert_eq!(record.progress(), 1.0);
    assert_eq!(
        record.archive.as_ref().unwrap().download_url,
        "/download/all_ads.zip"
    );
    assert!(record.log[0].starts_with("[1/2] Generated: AD1-A-C-D.mp4"));

    let graphs = transcoder.graphs.lock().unwrap();
    assert!(graphs.iter().all(|g| g.contains("concat=n=3:v=1:a=1")));
    assert!(graphs.iter().all(|g| !g.contains("xfade")));
}

#[test]
fn blended_batch_chains_dissolves_at_cumulative_offsets() {
    let ws = Workspace::scenario("blend");
    let transcoder = Arc::new(RecordingTranscoder::default());
    let status = StatusHandle::new();
    let settings = JobSettings {
        use_minihook: false,
        use_transition: true,
    };

    ws.runner(transcoder.clone())
        .run(settings, &status, &CancelFlag::new());

    assert_eq!(status.snapshot().status, JobStatus::Completed);
    let graphs = transcoder.graphs.lock().unwrap();
    assert_eq!(graphs.len(), 2);
    for graph in graphs.iter() {
        assert!(graph.contains("xfade=transition=fade:duration=0.500:offset=1.500"));
        assert!(graph.contains("xfade=transition=fade:duration=0.500:offset=3.000[vout]"));
        assert_eq!(graph.matches("acrossfade=d=0.500").count(), 2);
        assert!(!graph.contains("concat"));
    }
}

#[test]
fn missing_required_category_fails_without_outputs() {
    let ws = Workspace::new("missing_cta");
    ws.upload("hooks", &["A.mp4"]);
    ws.upload("bodies", &["C.mp4"]);
    let status = StatusHandle::new();

    let report = ws
        .runner(Arc::new(RecordingTranscoder::default()))
        .run(cut(), &status, &CancelFlag::new());

    assert!(report.outcomes.is_empty());
    let record = status.snapshot();
    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.completed, 0);
    assert!(record.error.unwrap().contains("call-to-action"));
    assert!(ws.rendered().is_empty());
    assert!(!ws.output().join("all_ads.zip").exists());
}

#[test]
fn failed_items_count_toward_progress_but_not_the_archive() {
    let ws = Workspace::new("isolation");
    ws.upload("hooks", &["A.mp4", "B.mp4", "E.mp4"]);
    ws.upload("bodies", &["C.mp4"]);
    ws.upload("ctas", &["D.mp4"]);
    let status = StatusHandle::new();

    let report = ws
        .runner(Arc::new(RecordingTranscoder::failing(&[2])))
        .run(cut(), &status, &CancelFlag::new());

    assert_eq!(report.successes(), 2);
    assert_eq!(report.failures(), 1);

    let record = status.snapshot();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.completed, 3);
    assert_eq!(record.total, 3);
    assert!(record.log.iter().any(|l| l.starts_with("[2/3] Error on AD2-B-C-D.mp4")));
    assert_eq!(ws.archive_entries(), vec!["AD1-A-C-D.mp4", "AD3-E-C-D.mp4"]);
}

#[test]
fn every_item_logs_exactly_one_outcome_line() {
    let ws = Workspace::new("log_lines");
    ws.upload("minihooks", &["M.mp4"]);
    ws.upload("hooks", &["A.mp4", "B.mp4"]);
    ws.upload("bodies", &["C.mp4", "F.mp4"]);
    ws.upload("ctas", &["D.mp4"]);
    let status = StatusHandle::new();
    let settings = JobSettings {
        use_minihook: true,
        use_transition: false,
    };

    ws.runner(Arc::new(RecordingTranscoder::failing(&[3])))
        .run(settings, &status, &CancelFlag::new());

    let record = status.snapshot();
    let outcome_lines = record
        .log
        .iter()
        .filter(|l| l.starts_with('['))
        .count();
    assert_eq!(record.total, 4);
    assert_eq!(outcome_lines, 4);
    assert_eq!(
        ws.rendered(),
        vec!["AD1-M-A-C-D.mp4", "AD2-M-A-F-D.mp4", "AD4-M-B-F-D.mp4"]
    );
}

#[test]
fn requested_minihook_without_files_is_a_note_not_a_failure() {
    let ws = Workspace::scenario("no_minihook");
    let status = StatusHandle::new();
    let settings = JobSettings {
        use_minihook: true,
        use_transition: false,
    };

    ws.runner(Arc::new(RecordingTranscoder::default()))
        .run(settings, &status, &CancelFlag::new());

    let record = status.snapshot();
    assert_eq!(record.status, JobStatus::Completed);
    assert!(record.log[0].contains("continuing without mini-hook"));
    assert_eq!(ws.rendered(), vec!["AD1-A-C-D.mp4", "AD2-B-C-D.mp4"]);
}

#[test]
fn rerun_replaces_the_previous_batch() {
    let ws = Workspace::scenario("rerun");
    let runner = ws.runner(Arc::new(RecordingTranscoder::default()));
    let status = StatusHandle::new();

    runner.run(cut(), &status, &CancelFlag::new());
    let first = ws.archive_entries();
    runner.run(cut(), &status, &CancelFlag::new());

    assert_eq!(ws.archive_entries(), first);
    assert_eq!(ws.rendered(), vec!["AD1-A-C-D.mp4", "AD2-B-C-D.mp4"]);
    let record = status.snapshot();
    assert_eq!(record.completed, 2);
    assert_eq!(record.log.iter().filter(|l| l.starts_with('[')).count(), 2);
}

#[test]
fn cancellation_stops_between_items_without_archive() {
    let ws = Workspace::new("cancel");
    ws.upload("hooks", &["A.mp4", "B.mp4", "E.mp4", "G.mp4"]);
    ws.upload("bodies", &["C.mp4"]);
    ws.upload("ctas", &["D.mp4"]);
    let transcoder = Arc::new(RecordingTranscoder {
        cancel_at: Some(2),
        ..RecordingTranscoder::default()
    });
    let status = StatusHandle::new();

    let report = ws
        .runner(transcoder)
        .run(cut(), &status, &CancelFlag::new());

    assert!(report.cancelled);
    assert_eq!(report.outcomes.len(), 2);
    let record = status.snapshot();
    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(
        record.error.as_deref(),
        Some("Batch cancelled after 2 of 4 items")
    );
    assert!(!ws.output().join("all_ads.zip").exists());
}

#[test]
fn cancel_after_last_item_still_archives() {
    let ws = Workspace::scenario("late_cancel");
    let transcoder = Arc::new(RecordingTranscoder {
        cancel_at: Some(2),
        ..RecordingTranscoder::default()
    });
    let status = StatusHandle::new();

    let report = ws
        .runner(transcoder)
        .run(cut(), &status, &CancelFlag::new());

    assert!(!report.cancelled);
    assert_eq!(status.snapshot().status, JobStatus::Completed);
    assert_eq!(ws.archive_entries(), vec!["AD1-A-C-D.mp4", "AD2-B-C-D.mp4"]);
}

#[tokio::test]
async fn second_start_is_rejected_while_running() {
    let ws = Workspace::scenario("conflict");
    let gate = Arc::new(AtomicBool::new(false));
    let transcoder = Arc::new(RecordingTranscoder {
        gate: Some(gate.clone()),
        ..RecordingTranscoder::default()
    });
    let manager = JobManager::new(Arc::new(ws.runner(transcoder)));

    let handle = manager.start(cut()).unwrap();
    assert!(manager.is_running());
    assert!(matches!(
        manager.start(cut()),
        Err(HookreelError::JobConflict)
    ));

    gate.store(true, Ordering::SeqCst);
    let report = handle.await.unwrap();
    assert_eq!(report.successes(), 2);
    assert_eq!(manager.status().status, JobStatus::Completed);
    assert!(manager.start(cut()).unwrap().await.is_ok());
}

#[tokio::test]
async fn manager_cancel_reaches_the_running_batch() {
    let ws = Workspace::scenario("manager_cancel");
    let gate = Arc::new(AtomicBool::new(false));
    let transcoder = Arc::new(RecordingTranscoder {
        gate: Some(gate.clone()),
        ..RecordingTranscoder::default()
    });
    let manager = JobManager::new(Arc::new(ws.runner(transcoder)));

    let handle = manager.start(cut()).unwrap();
    assert!(manager.cancel());
    gate.store(true, Ordering::SeqCst);

    let report = handle.await.unwrap();
    assert!(report.cancelled);
    assert!(report.outcomes.len() <= 1);
    assert_eq!(manager.status().status, JobStatus::Failed);
    assert!(!ws.output().join("all_ads.zip").exists());
}
