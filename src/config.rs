//! Runtime configuration
//!
//! Values are resolved in priority order:
//! 1. Command-line argument / environment variable (handled by clap in `main.rs`)
//! 2. TOML config file
//! 3. Compiled defaults

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ingest::sampler::SamplingMode;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    /// Config file is not valid TOML for [`Config`]
    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
}

/// Everything the pipeline and the CLI need to know about their environment
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage bucket holding sign icons
    pub bucket: String,
    /// Folder inside the bucket that bulk uploads land in
    pub library_prefix: String,
    /// Base URL of the storage service, used to build public URLs
    pub public_base_url: String,
    /// Largest accepted single upload, in bytes
    pub max_upload_bytes: u64,
    /// Maximum number of entries returned when listing the library
    pub list_limit: usize,
    /// Sampling options for dominant color detection
    pub sampling: SamplingConfig,
    /// Longest side of generated preview thumbnails
    pub preview_size: u32,
    /// Directory holding preview thumbnails while a batch is staged
    pub preview_dir: PathBuf,
    /// SQLite database backing the object store
    pub database_path: PathBuf,
    /// How many files are decoded and sampled at once during staging
    pub stage_concurrency: usize,
}

/// Dominant color sampling options
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub mode: SamplingMode,
    /// Visit every Nth pixel
    pub step: usize,
    /// Images are bounded to this side length before sampling
    pub max_dimension: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            mode: SamplingMode::Sqrt,
            step: 1,
            max_dimension: 100,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket: "sign-icons".to_string(),
            library_prefix: "library".to_string(),
            public_base_url: "http://localhost:54321".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
            list_limit: 1000,
            sampling: SamplingConfig::default(),
            preview_size: 256,
            preview_dir: default_preview_dir(),
            database_path: default_database_path(),
            stage_concurrency: 4,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file; missing keys fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the config file if one is given or present in the user config dir,
    /// otherwise use compiled defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match default_config_file() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// ~/.config/sign-library/config.toml on Linux
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sign-library").join("config.toml"))
}

/// ~/.cache/sign-library/previews on Linux
fn default_preview_dir() -> PathBuf {
    dirs::cache_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("sign-library")
        .join("previews")
}

/// ~/.local/share/sign-library/sign_library.db on Linux
fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sign-library")
        .join("sign_library.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bucket, "sign-icons");
        assert_eq!(config.library_prefix, "library");
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.list_limit, 1000);
        assert_eq!(config.sampling.step, 1);
        assert_eq!(config.sampling.mode, SamplingMode::Sqrt);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            bucket = "test-bucket"
            stage_concurrency = 2

            [sampling]
            mode = "simple"
            step = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.bucket, "test-bucket");
        assert_eq!(config.stage_concurrency, 2);
        assert_eq!(config.sampling.mode, SamplingMode::Simple);
        assert_eq!(config.sampling.step, 4);
        assert_eq!(config.sampling.max_dimension, 100);
        assert_eq!(config.library_prefix, "library");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = Config::from_file(Path::new("/nonexistent/sign-library.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }
}
