use anyhow::{Context, Result};
use infrastructure::config::{BackendKind, DeskConfig};
use std::path::PathBuf;
use std::sync::Arc;
use storage::{StorageArea, StorageKind};
use tracing::info;

/// Storage opened from the resolved configuration, shared by the data
/// commands of one run.
pub struct AppContext {
    pub config: DeskConfig,
    pub area: Arc<StorageArea>,
    /// `None` for the in-memory area
    pub database_path: Option<PathBuf>,
}

impl AppContext {
    pub fn open(config: DeskConfig, memory: bool) -> Result<Self> {
        let quota = config.storage.quota_bytes;

        if memory || config.storage.backend == BackendKind::Memory {
            info!("Using in-memory storage");
            let area = StorageArea::in_memory(StorageKind::Session).with_quota(quota);
            return Ok(Self {
                config,
                area: Arc::new(area),
                database_path: None,
            });
        }

        let path = config.database_path();
        let area = StorageArea::open_local(&path, config.storage.pool_size)
            .with_context(|| format!("Failed to open storage at {}", path.display()))?
            .with_quota(quota);

        Ok(Self {
            config,
            area: Arc::new(area),
            database_path: Some(path),
        })
    }

    pub fn schema_version(&self) -> &str {
        &self.config.storage.schema_version
    }
}
