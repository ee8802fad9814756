use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::retry::RetryPolicy;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TALLY_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub store: StoreConfig,
}

/// Tuning for how the ledger talks to its store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Upper bound on any single store call.
    pub store_timeout_ms: u64,
    /// How many times a conditional write may lose a race before the
    /// operation fails with `Contention`.
    pub max_conflict_retries: u32,
    /// Backoff for reads that hit a transient store failure.
    pub read_retry: RetryPolicy,
}

impl LedgerConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: 10_000,
            max_conflict_retries: 32,
            read_retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// The configured store directory, or the platform default.
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_store_path)
    }
}

pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally")
        .join("store")
}

fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::config_dir().map(|p| p.join("tally").join("config.toml"))
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        config.ledger.read_retry = config.ledger.read_retry.normalized();
        Ok(config)
    }

    /// Reads a config file. A missing file yields the defaults; an
    /// unreadable or malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Loads the config from `$TALLY_CONFIG`, falling back to
/// `<config dir>/tally/config.toml`.
pub fn load_config() -> Result<Config, ConfigError> {
    match config_path() {
        Some(path) => Config::load_from(&path),
        None => Ok(Config::default()),
    }
}
