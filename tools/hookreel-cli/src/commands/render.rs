//! Render a full batch and wait for the archive.

use std::sync::Arc;
use std::time::Duration;

use hookreel_assembly::{BatchRunner, JobManager};
use hookreel_common::config::AppConfig;
use hookreel_model::{JobSettings, JobStatus};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub async fn run(config: AppConfig, settings: JobSettings) -> anyhow::Result<()> {
    let runner = BatchRunner::from_config(&config);
    if !runner.transcoder().is_available() {
        anyhow::bail!(
            "{} not found. Install FFmpeg or set ffmpeg_bin in the config",
            config.ffmpeg_bin
        );
    }

    let manager = JobManager::new(Arc::new(runner));
    let mut handle = manager.start(settings)?;
    println!("Rendering into {}", config.storage.output_dir.display());

    let mut printed = 0usize;
    let mut cancel_sent = false;
    let report = loop {
        tokio::select! {
            joined = &mut handle => break joined?,
            _ = tokio::signal::ctrl_c(), if !cancel_sent => {
                println!("Cancelling: stopping the current render...");
                manager.cancel();
                cancel_sent = true;
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
        let status = manager.status();
        for line in status.log.iter().skip(printed) {
            println!("{line}");
        }
        printed = status.log.len();
    };

    let status = manager.status();
    for line in status.log.iter().skip(printed) {
        println!("{line}");
    }

    println!();
    println!(
        "Rendered {} of {} ad(s), {} failed",
        report.successes(),
        status.total,
        report.failures()
    );

    match status.status {
        JobStatus::Completed => {
            if let Some(archive) = &status.archive {
                println!("Archive: {}", archive.path.display());
            }
            Ok(())
        }
        _ => anyhow::bail!(
            "Batch failed: {}",
            status.error.as_deref().unwrap_or("unknown error")
        ),
    }
}
