#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for apx
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/apx/config.toml)
//! - Environment variables
//! - CLI flags (applied by the caller)

use apx_errors::{ConfigError, Error};
use apx_types::ResolvedLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub download: DownloadConfig,

    #[serde(default)]
    pub progress: ProgressConfig,

    #[serde(default)]
    pub version: VersionConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

/// Limits handed to every downloader unless a call overrides them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_failed_retry_count")]
    pub failed_retry_count: u32,
}

/// Speed sampling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Number of samples in the smoothing window
    #[serde(default = "default_speed_window")]
    pub speed_window: usize,
    /// Samples closer together than this are folded into the next one
    #[serde(default = "default_min_sample_interval_ms")]
    pub min_sample_interval_ms: u64,
    #[serde(default = "default_ema_alpha")]
    pub ema_alpha: f64,
    #[serde(default = "default_outlier_threshold")]
    pub outlier_threshold: f64,
}

/// Patch version display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionConfig {
    #[serde(default = "default_encode")]
    pub encode: bool,
    #[serde(default = "default_encode_length")]
    pub length: usize,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_seed")]
    pub seed: u32,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Directory the mirror package manager copies from
    pub mirror: Option<PathBuf>,
    /// Directory fetched packages land in
    pub sandbox: Option<PathBuf>,
    /// Catalog describing packages and assets
    pub catalog: Option<PathBuf>,
}

// Default implementations

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            failed_retry_count: default_failed_retry_count(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            speed_window: default_speed_window(),
            min_sample_interval_ms: default_min_sample_interval_ms(),
            ema_alpha: default_ema_alpha(),
            outlier_threshold: default_outlier_threshold(),
        }
    }
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            encode: default_encode(),
            length: default_encode_length(),
            separator: default_separator(),
            seed: default_seed(),
        }
    }
}

// Default value functions for serde
fn default_max_concurrency() -> usize {
    4
}

fn default_failed_retry_count() -> u32 {
    3
}

fn default_speed_window() -> usize {
    10
}

fn default_min_sample_interval_ms() -> u64 {
    50
}

fn default_ema_alpha() -> f64 {
    0.3
}

fn default_outlier_threshold() -> f64 {
    2.0
}

fn default_encode() -> bool {
    true
}

fn default_encode_length() -> usize {
    6
}

fn default_separator() -> String {
    "-".to_string()
}

fn default_seed() -> u32 {
    1 << 5
}

impl DownloadConfig {
    /// Limits used when a call leaves them unset
    #[must_use]
    pub fn limits(&self) -> ResolvedLimits {
        ResolvedLimits {
            max_concurrency: self.max_concurrency.max(1),
            failed_retry_count: self.failed_retry_count,
        }
    }
}

impl ProgressConfig {
    #[must_use]
    pub fn min_sample_interval(&self) -> Duration {
        Duration::from_millis(self.min_sample_interval_ms)
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("apx").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Reject values the orchestrator cannot work with
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.progress.speed_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "progress.speed_window".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.progress.ema_alpha) {
            return Err(ConfigError::InvalidValue {
                field: "progress.ema_alpha".to_string(),
                value: self.progress.ema_alpha.to_string(),
            }
            .into());
        }
        if self.version.length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "version.length".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // APX_MAX_CONCURRENCY
        if let Ok(value) = std::env::var("APX_MAX_CONCURRENCY") {
            self.download.max_concurrency =
                value.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "APX_MAX_CONCURRENCY".to_string(),
                    value,
                })?;
        }

        // APX_RETRY_COUNT
        if let Ok(value) = std::env::var("APX_RETRY_COUNT") {
            self.download.failed_retry_count =
                value.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "APX_RETRY_COUNT".to_string(),
                    value,
                })?;
        }

        if let Ok(value) = std::env::var("APX_SANDBOX") {
            self.paths.sandbox = Some(PathBuf::from(value));
        }

        if let Ok(value) = std::env::var("APX_MIRROR") {
            self.paths.mirror = Some(PathBuf::from(value));
        }

        Ok(())
    }

    /// Get the sandbox path (with default)
    #[must_use]
    pub fn sandbox_path(&self) -> PathBuf {
        self.paths.sandbox.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("apx")
                .join("sandbox")
        })
    }

    /// Get the mirror path
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` when no mirror is configured.
    pub fn mirror_path(&self) -> Result<PathBuf, Error> {
        self.paths.mirror.clone().ok_or_else(|| {
            ConfigError::MissingField {
                field: "mirror".to_string(),
            }
            .into()
        })
    }

    /// Get the catalog path, defaulting to `catalog.toml` inside the mirror
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` when neither a catalog nor a
    /// mirror is configured.
    pub fn catalog_path(&self) -> Result<PathBuf, Error> {
        match &self.paths.catalog {
            Some(path) => Ok(path.clone()),
            None => Ok(self.mirror_path()?.join("catalog.toml")),
        }
    }
}
