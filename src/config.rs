//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::storage::FlushType;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Chain storage and flush scheduler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_flush_interval")]
    pub flush_interval_ms: u64,

    #[serde(default)]
    pub flush_type: FlushType,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("chainlog").to_string_lossy().to_string())
        .unwrap_or_else(|| "./chainlog_data".to_string())
}

fn default_flush_interval() -> u64 {
    5000 // 5 seconds
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            flush_interval_ms: default_flush_interval(),
            flush_type: FlushType::default(),
        }
    }
}

impl StorageConfig {
    /// Pause between flush ticks
    pub fn flush_duration(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Directory holding the chain files
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        // Try default config locations
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("chainlog").join("config.toml")),
            Some(PathBuf::from("/etc/chainlog/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths).unwrap_or_else(|| {
            // Fall back to environment-only config
            tracing::info!("Using default config with environment overrides");
            Self::from_env()
        })
    }

    /// Load the first existing config file that parses
    fn load_first(paths: &[PathBuf]) -> Option<Self> {
        for path in paths.iter().filter(|p| p.exists()) {
            match Self::load_with_env(path) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    return Some(config);
                }
                Err(e) => {
                    tracing::warn!("Failed to load config from {:?}: {}", path, e);
                }
            }
        }
        None
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Storage overrides
        if let Some(data_dir) = lookup("CHAINLOG_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }
        if let Some(interval) = lookup("CHAINLOG_FLUSH_INTERVAL_MS") {
            match interval.parse() {
                Ok(ms) => self.storage.flush_interval_ms = ms,
                Err(_) => tracing::warn!("Ignoring invalid CHAINLOG_FLUSH_INTERVAL_MS: {}", interval),
            }
        }
        if let Some(flush_type) = lookup("CHAINLOG_FLUSH_TYPE") {
            match flush_type.to_lowercase().as_str() {
                "time" => self.storage.flush_type = FlushType::Time,
                "space" => self.storage.flush_type = FlushType::Space,
                other => tracing::warn!("Ignoring unknown CHAINLOG_FLUSH_TYPE: {}", other),
            }
        }

        // Logging overrides
        if let Some(level) = lookup("CHAINLOG_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("CHAINLOG_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
///
/// `data_dir` is written out resolved; paths in the file are used as-is.
pub fn generate_default_config() -> String {
    DEFAULT_CONFIG_TEMPLATE.replace("{data_dir}", &default_data_dir().replace('\\', "/"))
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Chainlog Configuration
#
# Environment variables override these settings:
# - CHAINLOG_DATA_DIR
# - CHAINLOG_FLUSH_INTERVAL_MS
# - CHAINLOG_FLUSH_TYPE
# - CHAINLOG_LOG_LEVEL
# - CHAINLOG_LOG_FORMAT

[storage]
# Directory for chain files (one <route>.json per chain)
data_dir = '{data_dir}'

# How often the scheduler commits chains with new blocks (ms)
flush_interval_ms = 5000

# Flush strategy: time (interval based) or space (not supported yet)
flush_type = "time"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#;
