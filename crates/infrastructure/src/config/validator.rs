use super::{ConfigError, DeskConfig, LoggingSettings, NetworkConfig, StorageConfig};
use common::ValidationErrors;
use pwa::PwaConfig;
use tracing::warn;

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    /// Collects every problem instead of stopping at the first one.
    pub fn validate(&self, config: &DeskConfig) -> Result<(), ConfigError> {
        let mut errors = ValidationErrors::new();
        self.validate_storage_config(&config.storage, &mut errors);
        self.validate_network_config(&config.network, &mut errors);
        self.validate_logging_config(&config.logging, &mut errors);
        self.validate_pwa_config(&config.pwa, &mut errors);
        errors.into_result().map_err(ConfigError::Invalid)
    }

    fn validate_storage_config(&self, config: &StorageConfig, errors: &mut ValidationErrors) {
        if config.quota_bytes == 0 {
            errors.push("storage.quota_bytes must be greater than 0");
        }

        if config.pool_size == 0 {
            errors.push("storage.pool_size must be greater than 0");
        }

        if !is_schema_version(&config.schema_version) {
            errors.push(format!(
                "storage.schema_version '{}' must look like 1 or 1.0",
                config.schema_version
            ));
        }

        if let Some(dir) = &config.data_dir {
            if !dir.exists() {
                warn!("Data directory does not exist yet: {}", dir.display());
            }
        }
    }

    fn validate_network_config(&self, config: &NetworkConfig, errors: &mut ValidationErrors) {
        if config.check_interval_secs == 0 {
            errors.push("network.check_interval_secs must be greater than 0");
        }

        if config.probe_timeout_ms == 0 {
            errors.push("network.probe_timeout_ms must be greater than 0");
        }

        if let Some(probe_url) = &config.probe_url {
            if let Err(e) = url::Url::parse(probe_url) {
                errors.push(format!("network.probe_url '{}' is invalid: {}", probe_url, e));
            }
        }
    }

    fn validate_logging_config(&self, config: &LoggingSettings, errors: &mut ValidationErrors) {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&config.level.to_lowercase().as_str()) {
            errors.push(format!(
                "logging.level '{}' must be one of: {}",
                config.level,
                valid_levels.join(", ")
            ));
        }
    }

    fn validate_pwa_config(&self, config: &PwaConfig, errors: &mut ValidationErrors) {
        if config.network_check_interval_ms == 0 {
            errors.push("pwa.network_check_interval_ms must be greater than 0");
        }

        if config.cache_version.trim().is_empty() {
            errors.push("pwa.cache_version cannot be empty");
        }
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Dot-separated numeric components, e.g. `1`, `1.0`, `2.3.1`.
fn is_schema_version(version: &str) -> bool {
    !version.is_empty()
        && version
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}
