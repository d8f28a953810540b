//! External ffmpeg/ffprobe invocation.

use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use serde::Serialize;

use hookreel_common::config::{AppConfig, EncodingConfig};
use hookreel_common::error::{HookreelError, HookreelResult};

use crate::cancel::CancelFlag;
use crate::graph::FilterGraph;
use crate::transition::DurationProbe;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const STDERR_TAIL_LINES: usize = 20;

/// Everything needed to render one combination.
#[derive(Debug, Clone, Serialize)]
pub struct TranscodeRequest {
    /// Input files, in graph input order.
    pub inputs: Vec<PathBuf>,
    pub graph: FilterGraph,
    pub output_path: PathBuf,
}

/// Trait for render backends.
pub trait Transcoder: Send + Sync {
    /// Render `request.output_path`. Must not leave a partial file on error.
    fn transcode(&self, request: &TranscodeRequest, cancel: &CancelFlag) -> HookreelResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Renders through an `ffmpeg` subprocess with a wall-clock limit.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: String,
    encoding: EncodingConfig,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<String>, encoding: EncodingConfig) -> Self {
        Self {
            binary: binary.into(),
            encoding,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.ffmpeg_bin.clone(), config.encoding.clone())
    }

    /// Full argument list for `request`, excluding the binary.
    pub fn build_args(&self, request: &TranscodeRequest) -> Vec<String> {
        let enc = &self.encoding;
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
        ];

        for input in &request.inputs {
            args.push("-i".to_string());
            args.push(input.display().to_string());
        }

        args.push("-filter_complex".to_string());
        args.push(request.graph.to_filter_complex());
        args.push("-map".to_string());
        args.push(request.graph.video_out.map_arg());
        args.push("-map".to_string());
        args.push(request.graph.audio_out.map_arg());

        args.extend([
            "-c:v".to_string(),
            enc.video_codec.clone(),
            "-preset".to_string(),
            enc.preset.clone(),
            "-crf".to_string(),
            enc.crf.to_string(),
            "-threads".to_string(),
            enc.threads.to_string(),
            "-pix_fmt".to_string(),
            enc.pixel_format.clone(),
            "-c:a".to_string(),
            enc.audio_codec.clone(),
            "-b:a".to_string(),
            format!("{}k", enc.audio_bitrate_kbps),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]);

        args.push(request.output_path.display().to_string());
        args
    }

    fn run(&self, args: &[String], cancel: &CancelFlag) -> HookreelResult<()> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| HookreelError::transcode(format!("Failed to start ffmpeg: {e}")))?;

        tracing::debug!(pid = child.id(), "ffmpeg process started");

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| HookreelError::transcode("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let timeout = Duration::from_secs(self.encoding.timeout_secs);
        let waited = wait_with_deadline(&mut child, timeout, cancel);

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        let status = waited?;
        if !status.success() {
            return Err(HookreelError::transcode(format!(
                "ffmpeg failed (status {status}): {}",
                stderr_tail(&stderr_output, STDERR_TAIL_LINES)
            )));
        }
        Ok(())
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, request: &TranscodeRequest, cancel: &CancelFlag) -> HookreelResult<()> {
        let started = Instant::now();
        let args = self.build_args(request);
        let result = self.run(&args, cancel);

        match &result {
            Ok(()) => tracing::info!(
                output = %request.output_path.display(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Render finished"
            ),
            Err(e) => {
                tracing::warn!(
                    output = %request.output_path.display(),
                    error = %e,
                    "Render failed"
                );
                discard_partial(&request.output_path);
            }
        }
        result
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Poll `child` until it exits, the deadline passes, or `cancel` is set.
/// Timed-out and cancelled children are killed and reaped.
fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
    cancel: &CancelFlag,
) -> HookreelResult<ExitStatus> {
    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => {
                kill_and_reap(child);
                return Err(HookreelError::transcode(format!(
                    "Failed to wait on ffmpeg: {e}"
                )));
            }
        }

        if cancel.is_cancelled() {
            tracing::info!(pid = child.id(), "Killing ffmpeg on cancellation");
            kill_and_reap(child);
            return Err(HookreelError::Cancelled);
        }

        if started.elapsed() >= timeout {
            tracing::warn!(
                pid = child.id(),
                timeout_secs = timeout.as_secs(),
                "Killing ffmpeg after timeout"
            );
            kill_and_reap(child);
            return Err(HookreelError::Timeout {
                secs: timeout.as_secs(),
            });
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "ffmpeg kill failed (already exited?)");
    }
    let _ = child.wait();
}

fn discard_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial output"),
    }
}

/// Last `max_lines` non-empty lines of `output`.
pub fn stderr_tail(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join(" | ")
}

/// Reads container durations with `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: String,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.ffprobe_bin.clone())
    }
}

impl DurationProbe for FfprobeProbe {
    fn probe_duration(&self, path: &Path) -> HookreelResult<f64> {
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| HookreelError::probe(format!("Failed to start ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(HookreelError::probe(format!(
                "ffprobe failed on {} (status {}): {}",
                path.display(),
                output.status,
                stderr_tail(&String::from_utf8_lossy(&output.stderr), 5)
            )));
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            HookreelError::probe(format!("ffprobe reported no duration for {}", path.display()))
        })
    }
}

/// First line of ffprobe output as seconds.
pub fn parse_duration(raw: &str) -> Option<f64> {
    let secs = raw.lines().next()?.trim().parse::<f64>().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some(secs)
    } else {
        None
    }
}

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
