//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HookreelError, HookreelResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where segments are read from and renders are written to.
    pub storage: StorageConfig,

    /// Bounds on the combinatorial batch size.
    pub limits: AssemblyLimits,

    /// Transcoder parameters.
    pub encoding: EncodingConfig,

    /// Final archive naming.
    pub archive: ArchiveConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// ffmpeg executable.
    pub ffmpeg_bin: String,

    /// ffprobe executable.
    pub ffprobe_bin: String,
}

/// Storage layout for segment uploads and rendered output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the per-category upload directories.
    pub uploads_dir: PathBuf,

    /// Directory name (under `uploads_dir`) for mini-hook segments.
    pub minihook_dir: String,

    /// Directory name for hook segments.
    pub hook_dir: String,

    /// Directory name for body segments.
    pub body_dir: String,

    /// Directory name for call-to-action segments.
    pub cta_dir: String,

    /// Where rendered ads and the archive are written.
    pub output_dir: PathBuf,

    /// Accepted container extensions, lowercase and without the dot.
    pub extensions: Vec<String>,
}

/// Limits that keep a batch from exploding combinatorially.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyLimits {
    /// Maximum number of segments taken from each category.
    pub max_segments_per_category: usize,
}

/// Normalization and encoder parameters for each render.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Target frame width after scale/pad.
    pub frame_width: u32,

    /// Target frame height after scale/pad.
    pub frame_height: u32,

    /// Output frame rate, forced on every input before joining.
    pub frame_rate: u32,

    /// Pixel format forced on every input before joining.
    pub pixel_format: String,

    pub video_codec: String,

    /// x264 speed preset.
    pub preset: String,

    /// Constant rate factor.
    pub crf: u32,

    /// Encoder threads.
    pub threads: u32,

    pub audio_codec: String,

    pub audio_bitrate_kbps: u32,

    /// Cross-dissolve length in seconds.
    pub transition_secs: f64,

    /// Wall-clock limit for a single render.
    pub timeout_secs: u64,

    /// Extension of rendered files.
    pub output_extension: String,
}

/// Archive naming and publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// File name of the archive inside the output directory.
    pub file_name: String,

    /// URL prefix under which the output directory is served.
    pub download_prefix: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "hookreel=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            limits: AssemblyLimits::default(),
            encoding: EncodingConfig::default(),
            archive: ArchiveConfig::default(),
            logging: LoggingConfig::default(),
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            minihook_dir: "minihooks".to_string(),
            hook_dir: "hooks".to_string(),
            body_dir: "bodies".to_string(),
            cta_dir: "ctas".to_string(),
            output_dir: PathBuf::from("output"),
            extensions: vec![
                "mp4".to_string(),
                "mov".to_string(),
                "m4v".to_string(),
                "webm".to_string(),
                "mkv".to_string(),
            ],
        }
    }
}

impl StorageConfig {
    /// Storage rooted at `root`: `root/uploads/<category>` and `root/output`.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            uploads_dir: root.join("uploads"),
            output_dir: root.join("output"),
            ..Self::default()
        }
    }

    /// Whether `path` carries one of the accepted container extensions.
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }
}

impl Default for AssemblyLimits {
    fn default() -> Self {
        Self {
            max_segments_per_category: 5,
        }
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            frame_width: 720,
            frame_height: 1280,
            frame_rate: 30,
            pixel_format: "yuv420p".to_string(),
            video_codec: "libx264".to_string(),
            preset: "ultrafast".to_string(),
            crf: 23,
            threads: 4,
            audio_codec: "aac".to_string(),
            audio_bitrate_kbps: 192,
            transition_secs: 0.5,
            timeout_secs: 400,
            output_extension: "mp4".to_string(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            file_name: "all_ads.zip".to_string(),
            download_prefix: "/download".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location. A missing file yields defaults.
    pub fn load() -> HookreelResult<Self> {
        Self::load_or_default(&config_file_path())
    }

    /// Load `path` if it exists, otherwise defaults. Unreadable or invalid
    /// files are errors so the caller can report them once logging is up.
    pub fn load_or_default(path: &Path) -> HookreelResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Load config from an explicit file.
    pub fn load_from(path: &Path) -> HookreelResult<Self> {
        if !path.exists() {
            return Err(HookreelError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> HookreelResult<()> {
        if self.limits.max_segments_per_category == 0 {
            return Err(HookreelError::config(
                "limits.max_segments_per_category must be at least 1",
            ));
        }
        if self.encoding.frame_width == 0 || self.encoding.frame_height == 0 {
            return Err(HookreelError::config("encoding frame size must be non-zero"));
        }
        if !(self.encoding.transition_secs.is_finite() && self.encoding.transition_secs > 0.0) {
            return Err(HookreelError::config(
                "encoding.transition_secs must be a positive number",
            ));
        }
        if self.encoding.audio_bitrate_kbps < 32 {
            return Err(HookreelError::config(
                "encoding.audio_bitrate_kbps must be at least 32",
            ));
        }
        if self.encoding.timeout_secs == 0 {
            return Err(HookreelError::config("encoding.timeout_secs must be non-zero"));
        }
        if self.storage.extensions.is_empty() {
            return Err(HookreelError::config("storage.extensions must not be empty"));
        }
        Ok(())
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("hookreel").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let config = AppConfig::default();
        assert_eq!(config.limits.max_segments_per_category, 5);
        assert_eq!(config.encoding.frame_width, 720);
        assert_eq!(config.encoding.frame_height, 1280);
        assert_eq!(config.encoding.timeout_secs, 400);
        assert!((config.encoding.transition_secs - 0.5).abs() < 1e-9);
        assert_eq!(config.archive.file_name, "all_ads.zip");
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"limits":{"max_segments_per_category":3}}"#).unwrap();
        assert_eq!(config.limits.max_segments_per_category, 3);
        assert_eq!(config.storage.hook_dir, "hooks");
        assert_eq!(config.encoding.preset, "ultrafast");
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let mut config = AppConfig::default();
        config.limits.max_segments_per_category = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_supported_extensions_are_case_insensitive() {
        let storage = StorageConfig::default();
        assert!(storage.is_supported(Path::new("clip.MP4")));
        assert!(storage.is_supported(Path::new("clip.mov")));
        assert!(!storage.is_supported(Path::new("notes.txt")));
        assert!(!storage.is_supported(Path::new("no_extension")));
    }

    #[test]
    fn test_validate_rejects_low_audio_bitrate() {
        let mut config = AppConfig::default();
        config.encoding.audio_bitrate_kbps = 16;
        assert!(matches!(config.validate(), Err(HookreelError::Config { .. })));
        config.encoding.audio_bitrate_kbps = 32;
        config.validate().unwrap();
    }

    #[test]
    fn test_load_or_default_tolerates_absence_but_not_garbage() {
        let dir = std::env::temp_dir().join(format!(
            "hookreel_test_config_load_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let config = AppConfig::load_or_default(&path).unwrap();
        assert_eq!(config.encoding.crf, 23);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AppConfig::load_or_default(&path),
            Err(HookreelError::Json(_))
        ));

        std::fs::write(&path, r#"{"encoding":{"audio_bitrate_kbps":8}}"#).unwrap();
        assert!(matches!(
            AppConfig::load_or_default(&path),
            Err(HookreelError::Config { .. })
        ));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_from_missing_file() {
        let path = std::env::temp_dir().join("hookreel_test_missing_config.json");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(HookreelError::FileNotFound { .. })
        ));
    }
}
