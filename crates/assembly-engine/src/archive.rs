//! Final zip bundle of successful renders.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use hookreel_common::config::ArchiveConfig;
use hookreel_common::error::{HookreelError, HookreelResult};
use hookreel_model::ArchiveRef;

/// Writes the batch archive at a fixed, well-known location.
#[derive(Debug, Clone)]
pub struct ArchivePackager {
    output_dir: PathBuf,
    config: ArchiveConfig,
}

impl ArchivePackager {
    pub fn new(output_dir: impl Into<PathBuf>, config: ArchiveConfig) -> Self {
        Self {
            output_dir: output_dir.into(),
            config,
        }
    }

    pub fn archive_path(&self) -> PathBuf {
        self.output_dir.join(&self.config.file_name)
    }

    /// Retrieval location published in the status record.
    pub fn download_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.download_prefix.trim_end_matches('/'),
            self.config.file_name
        )
    }

    /// Bundle `files` under their base names. An empty list still produces a
    /// valid, empty archive.
    pub fn package(&self, files: &[PathBuf]) -> HookreelResult<ArchiveRef> {
        std::fs::create_dir_all(&self.output_dir)?;

        let final_path = self.archive_path();
        let partial_path = self
            .output_dir
            .join(format!(".{}.partial", self.config.file_name));

        if let Err(e) = write_archive(&partial_path, files) {
            let _ = std::fs::remove_file(&partial_path);
            return Err(e);
        }
        std::fs::rename(&partial_path, &final_path).map_err(|e| {
            HookreelError::archive(format!(
                "Failed to move archive into place at {}: {e}",
                final_path.display()
            ))
        })?;

        tracing::info!(
            archive = %final_path.display(),
            entries = files.len(),
            "Wrote batch archive"
        );

        Ok(ArchiveRef {
            path: final_path,
            download_url: self.download_url(),
        })
    }
}

fn write_archive(path: &Path, files: &[PathBuf]) -> HookreelResult<()> {
    let file = File::create(path).map_err(|e| {
        HookreelError::archive(format!("Failed to create {}: {e}", path.display()))
    })?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(true);

    for source in files {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                HookreelError::archive(format!("Unusable file name: {}", source.display()))
            })?;
        let mut input = File::open(source).map_err(|e| {
            HookreelError::archive(format!("Failed to open {}: {e}", source.display()))
        })?;
        zip.start_file(name, options)?;
        std::io::copy(&mut input, &mut zip).map_err(|e| {
            HookreelError::archive(format!("Failed to add {}: {e}", source.display()))
        })?;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    Ok(())
}
