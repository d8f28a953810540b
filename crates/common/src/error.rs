//! Error types shared across HookReel crates.

use std::path::PathBuf;

/// Top-level error type for HookReel operations.
#[derive(Debug, thiserror::Error)]
pub enum HookreelError {
    #[error("No {category} segments found in {}", dir.display())]
    MissingCategory { category: String, dir: PathBuf },

    #[error("Inventory error: {message}")]
    Inventory { message: String },

    #[error("Duration probe error: {message}")]
    Probe { message: String },

    #[error("Graph error: {message}")]
    Graph { message: String },

    #[error("Transcode error: {message}")]
    Transcode { message: String },

    #[error("Transcode timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Batch cancelled")]
    Cancelled,

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("A batch is already running")]
    JobConflict,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

/// Result type alias using HookreelError.
pub type HookreelResult<T> = Result<T, HookreelError>;

impl HookreelError {
    pub fn missing_category(category: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self::MissingCategory {
            category: category.into(),
            dir: dir.into(),
        }
    }

    pub fn inventory(msg: impl Into<String>) -> Self {
        Self::Inventory {
            message: msg.into(),
        }
    }

    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe {
            message: msg.into(),
        }
    }

    pub fn graph(msg: impl Into<String>) -> Self {
        Self::Graph {
            message: msg.into(),
        }
    }

    pub fn transcode(msg: impl Into<String>) -> Self {
        Self::Transcode {
            message: msg.into(),
        }
    }

    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
