//! # Application Configuration
//!
//! One file holds everything, with PascalCase keys:
//!
//! ```toml
//! [AI]
//! Provider = "Ollama"
//!
//! [Game]
//! ProcessName = "Warsim"
//!
//! [Loop]
//! DefaultDelayMs = 2000
//! ```
//!
//! `.json` files are read as JSON, anything else as TOML.

use aigamer_core::{DelayBounds, LoopSettings};
use aigamer_providers::AiSettings;
use aigamer_vision::{CaptureSettings, WindowQuery};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur in configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration not found: {0}")]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AppConfig {
    #[serde(rename = "AI")]
    pub ai: AiSettings,
    pub game: WindowQuery,
    pub capture: CaptureSettings,
    #[serde(rename = "Loop")]
    pub loop_config: LoopConfig,
    pub logging: LoggingConfig,
}

/// Pacing and retry settings for the game loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoopConfig {
    #[serde(default = "default_delay_ms")]
    pub default_delay_ms: u64,
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_delay_step_ms")]
    pub delay_step_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_focus_settle_ms")]
    pub focus_settle_ms: u64,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            default_delay_ms: default_delay_ms(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            delay_step_ms: default_delay_step_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            focus_settle_ms: default_focus_settle_ms(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_delay_ms() -> u64 {
    2000
}

fn default_min_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_delay_step_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_focus_settle_ms() -> u64 {
    500
}

fn default_backoff_ms() -> u64 {
    2000
}

impl LoopConfig {
    pub fn delay_bounds(&self) -> DelayBounds {
        DelayBounds {
            default: Duration::from_millis(self.default_delay_ms),
            min: Duration::from_millis(self.min_delay_ms),
            max: Duration::from_millis(self.max_delay_ms),
            step: Duration::from_millis(self.delay_step_ms),
        }
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            focus_settle: Duration::from_millis(self.focus_settle_ms),
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

/// Session log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoggingConfig {
    /// Directory for session log files
    #[serde(default = "default_log_dir")]
    pub directory: PathBuf,

    /// Level of tracing events copied into the session log
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_dir(),
            level: default_log_level(),
        }
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config: AppConfig = if is_json {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };

        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let l = &self.loop_config;
        if l.min_delay_ms > l.max_delay_ms {
            return Err(ConfigError::InvalidConfig(format!(
                "Loop.MinDelayMs ({}) is greater than Loop.MaxDelayMs ({})",
                l.min_delay_ms, l.max_delay_ms
            )));
        }
        if l.default_delay_ms < l.min_delay_ms || l.default_delay_ms > l.max_delay_ms {
            return Err(ConfigError::InvalidConfig(format!(
                "Loop.DefaultDelayMs ({}) must be between {} and {}",
                l.default_delay_ms, l.min_delay_ms, l.max_delay_ms
            )));
        }
        if l.max_retries == 0 {
            return Err(ConfigError::InvalidConfig(
                "Loop.MaxRetries must be at least 1".to_string(),
            ));
        }
        if self.capture.max_dimension == 0 {
            return Err(ConfigError::InvalidConfig(
                "Capture.MaxDimension must be greater than 0".to_string(),
            ));
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::InvalidConfig(format!(
                "Logging.Level '{}' is not a log level",
                self.logging.level
            )));
        }
        Ok(())
    }
}
