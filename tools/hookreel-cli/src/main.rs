//! HookReel CLI: prepare uploads, preview combinations, and render ad batches.
//!
//! Usage:
//!   hookreel init              Create the upload and output directories
//!   hookreel plan [OPTIONS]    List the combinations a batch would render
//!   hookreel render [OPTIONS]  Render every combination and build the archive
//!   hookreel check             Check ffmpeg, ffprobe, and configured directories

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use hookreel_common::config::{config_file_path, AppConfig};
use hookreel_model::JobSettings;

mod commands;

#[derive(Parser)]
#[command(
    name = "hookreel",
    about = "Combinatorial short-form ad assembly",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the XDG config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Working root holding `uploads/` and `output/`
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Per-batch toggles shared by `plan` and `render`.
#[derive(Args, Clone, Copy)]
struct BatchArgs {
    /// Prepend a mini-hook segment when any are uploaded
    #[arg(long)]
    minihook: bool,

    /// Cross-dissolve between segments instead of hard cuts
    #[arg(long)]
    transition: bool,
}

impl From<BatchArgs> for JobSettings {
    fn from(args: BatchArgs) -> Self {
        JobSettings {
            use_minihook: args.minihook,
            use_transition: args.transition,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the category upload directories and the output directory
    Init {
        /// Also write the effective configuration to the config file
        #[arg(long)]
        write_config: bool,
    },

    /// List combinations with sequence numbers and output names
    Plan {
        #[command(flatten)]
        batch: BatchArgs,

        /// Print each filter graph (probes durations when blending)
        #[arg(long)]
        graph: bool,

        /// Emit the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render every combination and package the archive
    Render {
        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Check system capabilities
    Check,
}

/// Resolve the effective config. A broken default config file is not fatal;
/// its error is returned for logging once the subscriber is installed.
fn load_config(cli: &Cli) -> anyhow::Result<(AppConfig, Option<String>)> {
    let (mut config, deferred) = match &cli.config {
        Some(path) => (AppConfig::load_from(path)?, None),
        None => match AppConfig::load() {
            Ok(config) => (config, None),
            Err(e) => (
                AppConfig::default(),
                Some(format!(
                    "Ignoring config at {}: {e}",
                    config_file_path().display()
                )),
            ),
        },
    };
    if let Some(root) = &cli.root {
        config.storage.uploads_dir = root.join("uploads");
        config.storage.output_dir = root.join("output");
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    config.validate()?;
    Ok((config, deferred))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, deferred) = load_config(&cli)?;

    hookreel_common::logging::init_logging(&config.logging);
    if let Some(warning) = deferred {
        tracing::warn!("{warning}");
    }

    match cli.command {
        Commands::Init { write_config } => commands::init::run(&config, write_config),
        Commands::Plan { batch, graph, json } => {
            commands::plan::run(&config, batch.into(), graph, json)
        }
        Commands::Render { batch } => commands::render::run(config, batch.into()).await,
        Commands::Check => commands::check::run(&config),
    }
}
