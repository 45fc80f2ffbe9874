//! Configuration module for staged-pipeline
//!
//! Covers the settings the binary needs to wire and run a pipeline:
//! - Queue capacity used for every stage output
//! - Logging filter and optional log directory
//! - Shape of the sample sensor pipeline
//! - Where to write the final run report
//!
//! # Config Location
//!
//! Without an explicit path the configuration is read from the platform config
//! directory:
//! - **Linux**: `~/.config/dev.staged-pipeline/pipeline.toml`
//! - **macOS**: `~/Library/Application Support/dev.staged-pipeline/pipeline.toml`
//! - **Windows**: `%APPDATA%\dev.staged-pipeline\pipeline.toml`
//!
//! Files ending in `.json` are read as JSON; everything else is TOML.
//!
//! # Example
//!
//! ```ignore
//! use staged_pipeline::config::PipelineConfig;
//!
//! let config = PipelineConfig::load("pipeline.toml")?;
//! config.validate()?;
//! let capacity = config.queue.capacity();
//! ```

use crate::error::{PipelineError, Result};
use crate::pipeline::QueueCapacity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.staged-pipeline";

/// Default config filename
pub const CONFIG_FILE: &str = "pipeline.toml";

/// Default log filter when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default prefix for rolling log files
pub const DEFAULT_LOG_FILE_PREFIX: &str = "staged-pipeline.log";

// ==================== Config Directory ====================

/// Get the application config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default config file
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

// ==================== Sections ====================

/// Queue settings shared by every stage output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum buffered messages per queue; `None` for unbounded
    #[serde(default)]
    pub capacity: Option<usize>,
}

impl QueueConfig {
    pub fn capacity(&self) -> QueueCapacity {
        QueueCapacity::from(self.capacity)
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Directory for daily rolling log files; console only when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// File name prefix for rolling log files
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn default_log_file_prefix() -> String {
    DEFAULT_LOG_FILE_PREFIX.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            directory: None,
            file_prefix: default_log_file_prefix(),
        }
    }
}

/// Shape of the sample sensor pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Frames produced by each sensor; one sensor per entry
    #[serde(default = "default_frames_per_sensor")]
    pub frames_per_sensor: Vec<usize>,

    /// Lower clamp bound for depth samples
    #[serde(default)]
    pub depth_min: u16,

    /// Upper clamp bound for depth samples
    #[serde(default = "default_depth_max")]
    pub depth_max: u16,

    /// Depth samples per frame
    #[serde(default = "default_frame_pixels")]
    pub frame_pixels: usize,
}

fn default_frames_per_sensor() -> Vec<usize> {
    vec![10, 10, 10]
}

fn default_depth_max() -> u16 {
    4000
}

fn default_frame_pixels() -> usize {
    64
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            frames_per_sensor: default_frames_per_sensor(),
            depth_min: 0,
            depth_max: default_depth_max(),
            frame_pixels: default_frame_pixels(),
        }
    }
}

// ==================== Pipeline Config ====================

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Write the run report as JSON here when set
    #[serde(default)]
    pub report_path: Option<PathBuf>,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub demo: DemoConfig,
}

impl PipelineConfig {
    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::parse(&content, ConfigFormat::for_path(path)).map_err(|e| {
            PipelineError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load a config file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config to disk, picking the format from the extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PipelineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = match ConfigFormat::for_path(path) {
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| e.to_string()),
        }
        .map_err(|e| PipelineError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            PipelineError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        let demo = &self.demo;
        if demo.frames_per_sensor.is_empty() {
            return Err(PipelineError::Config(
                "demo.frames_per_sensor needs at least one sensor".to_string(),
            ));
        }
        if demo.depth_min > demo.depth_max {
            return Err(PipelineError::Config(format!(
                "demo.depth_min ({}) is greater than demo.depth_max ({})",
                demo.depth_min, demo.depth_max
            )));
        }
        if demo.frame_pixels == 0 {
            return Err(PipelineError::Config(
                "demo.frame_pixels must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn parse(content: &str, format: ConfigFormat) -> std::result::Result<Self, String> {
        match format {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.queue.capacity(), QueueCapacity::Unbounded);
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.demo.frames_per_sensor.len(), 3);
        assert!(config.report_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = PipelineConfig::parse(
            r#"
            [queue]
            capacity = 4

            [demo]
            frames_per_sensor = [2, 5]
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(config.queue.capacity(), QueueCapacity::Bounded(4));
        assert_eq!(config.demo.frames_per_sensor, vec![2, 5]);
        assert_eq!(config.demo.depth_max, 4000);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("pipeline.toml");

        let mut config = PipelineConfig::default();
        config.queue.capacity = Some(0);
        config.demo.frames_per_sensor = vec![1, 2, 3, 4];
        config.report_path = Some(PathBuf::from("report.json"));
        config.save(&path).unwrap();

        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.queue.capacity(), QueueCapacity::Bounded(0));
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.json");

        let mut config = PipelineConfig::default();
        config.logging.filter = "staged_pipeline=debug".to_string();
        config.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.trim_start().starts_with('{'));
        assert_eq!(PipelineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            PipelineConfig::load(&missing),
            Err(PipelineError::Config(_))
        ));
        assert_eq!(
            PipelineConfig::load_or_default(&missing),
            PipelineConfig::default()
        );

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "queue = [").unwrap();
        let err = PipelineConfig::load(&broken).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_validate_rejects_bad_demo() {
        let mut config = PipelineConfig::default();
        config.demo.frames_per_sensor.clear();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.demo.depth_min = 10;
        config.demo.depth_max = 5;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.demo.frame_pixels = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with(Path::new(APP_ID).join(CONFIG_FILE)));
        }
    }
}
