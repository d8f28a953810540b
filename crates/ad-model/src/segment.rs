//! Segment categories and discovered segment files.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The slot a segment fills inside an ad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    MiniHook,
    Hook,
    Body,
    CallToAction,
}

impl Category {
    /// Fixed join order. Combinations never reorder categories.
    pub const ORDER: [Category; 4] = [
        Category::MiniHook,
        Category::Hook,
        Category::Body,
        Category::CallToAction,
    ];

    /// Whether a batch cannot start without at least one segment of this category.
    pub fn is_required(self) -> bool {
        !matches!(self, Category::MiniHook)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::MiniHook => "mini-hook",
            Category::Hook => "hook",
            Category::Body => "body",
            Category::CallToAction => "call-to-action",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One input media file tagged with its category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub category: Category,

    /// Absolute or storage-relative path to the media file.
    pub path: PathBuf,

    /// Display name used in output file names.
    pub label: String,

    /// Duration in seconds, when already known.
    #[serde(default)]
    pub duration_secs: Option<f64>,
}

impl Segment {
    /// Create a segment, deriving its label from the file name.
    pub fn new(category: Category, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = display_label(&path);
        Self {
            category,
            path,
            label,
            duration_secs: None,
        }
    }

    /// Attach a known duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// File name component of the path, used for sorting.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}

/// Derive the display label of a media file.
///
/// The extension is dropped, then everything from the first `" -"` on is cut
/// and the rest trimmed: `"Hook A - final cut.mp4"` becomes `"Hook A"`.
pub fn display_label(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let head = match stem.find(" -") {
        Some(idx) => &stem[..idx],
        None => stem.as_str(),
    };
    head.trim().to_string()
}
