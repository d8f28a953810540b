//! Segment discovery per category.

use std::path::{Path, PathBuf};

use hookreel_common::config::{AssemblyLimits, StorageConfig};
use hookreel_common::error::{HookreelError, HookreelResult};
use hookreel_model::{Category, JobSettings, Segment};

/// The capped, sorted segment lists a batch draws from.
///
/// Only active categories are held, in `Category::ORDER`. A mini-hook list
/// is present only when requested and non-empty.
#[derive(Debug, Clone, Default)]
pub struct SegmentInventory {
    lists: Vec<(Category, Vec<Segment>)>,
    notes: Vec<String>,
}

impl SegmentInventory {
    /// Scan the upload directories for one batch.
    ///
    /// Fails with [`HookreelError::MissingCategory`] when hook, body, or
    /// call-to-action has no usable file.
    pub fn discover(
        storage: &StorageConfig,
        limits: &AssemblyLimits,
        settings: &JobSettings,
    ) -> HookreelResult<Self> {
        let cap = limits.max_segments_per_category.max(1);
        let mut lists = Vec::with_capacity(Category::ORDER.len());
        let mut notes = Vec::new();

        for category in Category::ORDER {
            let dir = category_dir(storage, category);

            if category == Category::MiniHook && !settings.use_minihook {
                continue;
            }

            let files = match list_media_files(&dir, storage, cap) {
                Ok(files) => files,
                Err(e) if !category.is_required() => {
                    let note = format!("Mini-hook folder unreadable ({e}); continuing without mini-hook");
                    tracing::warn!(dir = %dir.display(), "{note}");
                    notes.push(note);
                    continue;
                }
                Err(e) => return Err(e),
            };
            tracing::debug!(
                category = %category,
                dir = %dir.display(),
                files = files.len(),
                "Scanned category directory"
            );

            if files.is_empty() {
                if category.is_required() {
                    return Err(HookreelError::missing_category(category.as_str(), dir));
                }
                let note = "Mini-hook requested but no files found; continuing without mini-hook"
                    .to_string();
                tracing::warn!(dir = %dir.display(), "{note}");
                notes.push(note);
                continue;
            }

            let segments = files
                .into_iter()
                .map(|path| Segment::new(category, path))
                .collect();
            lists.push((category, segments));
        }

        Ok(Self { lists, notes })
    }

    /// Assemble an inventory from in-memory lists.
    ///
    /// Lists are reordered into `Category::ORDER`; empty mini-hook lists are
    /// dropped. No precondition check is made, so an empty required list
    /// simply yields zero combinations.
    pub fn from_lists(lists: Vec<(Category, Vec<Segment>)>) -> Self {
        let mut lists: Vec<_> = lists
            .into_iter()
            .filter(|(category, segments)| category.is_required() || !segments.is_empty())
            .collect();
        lists.sort_by_key(|(category, _)| *category);
        lists.dedup_by_key(|(category, _)| *category);
        Self {
            lists,
            notes: Vec::new(),
        }
    }

    /// Active categories with their segments, in join order.
    pub fn lists(&self) -> &[(Category, Vec<Segment>)] {
        &self.lists
    }

    pub fn segments(&self, category: Category) -> &[Segment] {
        self.lists
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, segments)| segments.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_minihook(&self) -> bool {
        !self.segments(Category::MiniHook).is_empty()
    }

    /// Messages to surface in the batch log, such as the mini-hook fallback.
    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}

/// Upload directory of a category.
pub fn category_dir(storage: &StorageConfig, category: Category) -> PathBuf {
    let name = match category {
        Category::MiniHook => &storage.minihook_dir,
        Category::Hook => &storage.hook_dir,
        Category::Body => &storage.body_dir,
        Category::CallToAction => &storage.cta_dir,
    };
    storage.uploads_dir.join(name)
}

/// Supported media files in `dir`, sorted by file name and truncated to `cap`.
/// A missing directory is treated as empty.
pub fn list_media_files(
    dir: &Path,
    storage: &StorageConfig,
    cap: usize,
) -> HookreelResult<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(HookreelError::inventory(format!(
                "Failed to read {}: {e}",
                dir.display()
            )))
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            HookreelError::inventory(format!("Failed to list {}: {e}", dir.display()))
        })?;
        let path = entry.path();
        if path.is_file() && storage.is_supported(&path) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files.truncate(cap);
    Ok(files)
}
