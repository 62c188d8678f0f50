pub mod loader;
pub mod validator;

pub use loader::{ConfigLoader, ConfigSource};
pub use validator::ConfigValidator;

use common::{ErrorSeverity, HasSeverity, ValidationErrors};
use pwa::PwaConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DATA_DIR_NAME: &str = ".deskpad";
pub const DATABASE_FILE: &str = "deskpad.db";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(ValidationErrors),

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl HasSeverity for ConfigError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            ConfigError::Invalid(_) => ErrorSeverity::Medium,
            ConfigError::Parse { .. } => ErrorSeverity::High,
        }
    }
}

/// Top-level configuration of the deskpad tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeskConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub pwa: PwaConfig,
}

impl DeskConfig {
    /// Configured data directory, `~/.deskpad` otherwise. A leading `~`
    /// expands to the home directory.
    pub fn data_dir(&self) -> PathBuf {
        let home = || dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        match &self.storage.data_dir {
            Some(dir) => match dir.strip_prefix("~") {
                Ok(rest) => home().join(rest),
                Err(_) => dir.clone(),
            },
            None => home().join(DATA_DIR_NAME),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join(DATABASE_FILE)
    }
}

/// Where the local area keeps its data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(BackendKind::Sqlite),
            "memory" | "in-memory" | "inmemory" => Ok(BackendKind::Memory),
            other => Err(format!("Unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Defaults to `~/.deskpad`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: usize,

    /// Version written into every stored record
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            data_dir: None,
            quota_bytes: default_quota_bytes(),
            schema_version: default_schema_version(),
            pool_size: default_pool_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    /// Endpoint for latency probes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_url: Option<String>,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl NetworkConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            probe_url: None,
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// One JSON object per line instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LoggingSettings {
    pub fn to_logging_config(&self) -> common::LoggingConfig {
        common::LoggingConfig::default()
            .with_level_str(&self.level)
            .with_json(self.json)
    }
}

fn default_quota_bytes() -> usize {
    storage::DEFAULT_QUOTA_BYTES
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_pool_size() -> u32 {
    4
}

fn default_check_interval_secs() -> u64 {
    30
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DeskConfig::default();
        assert_eq!(config.storage.backend, BackendKind::Sqlite);
        assert_eq!(config.storage.quota_bytes, 5 * 1024 * 1024);
        assert_eq!(config.storage.schema_version, "1.0");
        assert_eq!(config.storage.pool_size, 4);
        assert_eq!(config.network.check_interval(), Duration::from_secs(30));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.pwa.cache_version, "v1.0.0");
        assert!(config.database_path().ends_with(".deskpad/deskpad.db"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let mut config = DeskConfig::default();
        config.storage.data_dir = Some(PathBuf::from("~/notes"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.data_dir(), home.join("notes"));
        }

        config.storage.data_dir = Some(PathBuf::from("/srv/deskpad"));
        assert_eq!(config.data_dir(), PathBuf::from("/srv/deskpad"));
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config: DeskConfig = toml::from_str("[storage]\npool_size = 2\n").unwrap();
        assert_eq!(config.storage.pool_size, 2);
        assert_eq!(config.storage.quota_bytes, storage::DEFAULT_QUOTA_BYTES);
        assert_eq!(config.network, NetworkConfig::default());
    }

    #[test]
    fn backend_names() {
        assert_eq!("SQLite".parse::<BackendKind>().unwrap(), BackendKind::Sqlite);
        assert_eq!("in-memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert!("redis".parse::<BackendKind>().is_err());
    }
}
