use super::{BackendKind, ConfigError, DeskConfig};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Default,
}

pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_paths: Self::default_config_paths(),
            env_prefix: "DESKPAD_".to_string(),
        }
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.config_paths.insert(0, path);
        self
    }

    /// Search only `paths`, in order.
    pub fn with_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.config_paths = paths;
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Current directory
        paths.push(PathBuf::from(".deskpadrc"));
        paths.push(PathBuf::from(".deskpadrc.toml"));
        paths.push(PathBuf::from(".deskpadrc.json"));
        paths.push(PathBuf::from("deskpad.toml"));
        paths.push(PathBuf::from("deskpad.json"));

        // User home directory
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".deskpadrc"));
            paths.push(home_dir.join(".deskpadrc.toml"));
            paths.push(home_dir.join(".deskpadrc.json"));
            paths.push(home_dir.join(".config").join("deskpad").join("config.toml"));
            paths.push(home_dir.join(".config").join("deskpad").join("config.json"));
        }

        // System config directory
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("deskpad").join("config.toml"));
            paths.push(config_dir.join("deskpad").join("config.json"));
        }

        paths
    }

    pub async fn load(&self) -> Result<DeskConfig> {
        self.load_with_source().await.map(|(config, _)| config)
    }

    /// Loads the first readable config file, then applies environment
    /// overrides. Unreadable files are skipped with a warning.
    pub async fn load_with_source(&self) -> Result<(DeskConfig, ConfigSource)> {
        let mut config = DeskConfig::default();
        let mut source = ConfigSource::Default;

        for path in &self.config_paths {
            if !path.exists() {
                continue;
            }
            match Self::load_file(path).await {
                Ok(file_config) => {
                    info!("Loaded configuration from: {}", path.display());
                    config = file_config;
                    source = ConfigSource::File(path.clone());
                    break; // Use first found config file
                }
                Err(e) => {
                    warn!("Failed to load config from {}: {:#}", path.display(), e);
                }
            }
        }

        if source == ConfigSource::Default {
            debug!("No config file found, using defaults");
        }

        let config = self.apply_env_overrides(config)?;
        Ok((config, source))
    }

    /// Loads exactly `path`; a missing or malformed file is an error.
    pub async fn load_from(&self, path: &Path) -> Result<DeskConfig> {
        let config = Self::load_file(path).await?;
        info!("Loaded configuration from: {}", path.display());
        self.apply_env_overrides(config)
    }

    async fn load_file(path: &Path) -> Result<DeskConfig> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        let parsed = match extension {
            "toml" | "" => toml::from_str(&content).map_err(|e| e.to_string()),
            "json" => serde_json::from_str(&content).map_err(|e| e.to_string()),
            _ => {
                // Try TOML first, then JSON
                toml::from_str(&content)
                    .or_else(|_| serde_json::from_str(&content))
                    .map_err(|e| e.to_string())
            }
        };

        parsed.map_err(|message| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            }
            .into()
        })
    }

    fn var(&self, name: &str) -> Option<String> {
        env::var(format!("{}{}", self.env_prefix, name)).ok()
    }

    fn apply_env_overrides(&self, mut config: DeskConfig) -> Result<DeskConfig> {
        // Storage settings
        if let Some(backend) = self.var("STORAGE_BACKEND") {
            config.storage.backend = backend
                .parse::<BackendKind>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("{}STORAGE_BACKEND", self.env_prefix))?;
        }

        if let Some(data_dir) = self.var("DATA_DIR") {
            config.storage.data_dir = Some(PathBuf::from(data_dir));
        }

        if let Some(quota) = self.var("QUOTA_BYTES") {
            config.storage.quota_bytes = quota
                .parse()
                .with_context(|| format!("{}QUOTA_BYTES must be a number", self.env_prefix))?;
        }

        // Logging settings
        if let Some(level) = self.var("LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Some(json) = self.var("LOG_JSON") {
            config.logging.json =
                json.to_lowercase() == "true" || json == "1" || json.to_lowercase() == "yes";
        }

        // Network settings
        if let Some(probe_url) = self.var("PROBE_URL") {
            config.network.probe_url = Some(probe_url);
        }

        if let Some(interval) = self.var("CHECK_INTERVAL_SECS") {
            config.network.check_interval_secs = interval.parse().with_context(|| {
                format!("{}CHECK_INTERVAL_SECS must be a number", self.env_prefix)
            })?;
        }

        Ok(config)
    }

    pub async fn save_config(&self, config: &DeskConfig, path: &Path) -> Result<()> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("toml");

        let content = match extension {
            "json" => serde_json::to_string_pretty(config)?,
            _ => toml::to_string_pretty(config)?,
        };

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        fs::write(path, content).await?;
        info!("Configuration saved to: {}", path.display());

        Ok(())
    }

    pub fn generate_example_config() -> String {
        let mut config = DeskConfig::default();
        config.storage.data_dir = Some(PathBuf::from("~/.deskpad"));
        config.network.probe_url = Some("https://www.google.com/favicon.ico".to_string());

        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| "Failed to generate example config".to_string())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
