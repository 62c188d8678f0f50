use crate::backend::{entry_size, MemoryBackend, StorageBackend};
use crate::error::{StorageError, StorageResult};
use crate::sqlite::SqliteBackend;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

/// Typical browser quota for a single origin's local area.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

const PROBE_KEY: &str = "__deskpad_storage_probe__";
const CHANGE_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Survives restarts
    Local,
    /// Lives as long as the process
    Session,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Local => write!(f, "local"),
            StorageKind::Session => write!(f, "session"),
        }
    }
}

/// Notification about a write to an area. `key == None` means the whole
/// area was cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub kind: StorageKind,
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    /// Handle that made the change
    pub origin: Uuid,
}

impl StorageChange {
    pub fn affects(&self, key: &str) -> bool {
        self.key.as_deref().map_or(true, |k| k == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityReport {
    pub used_bytes: usize,
    pub quota_bytes: usize,
    pub available_bytes: usize,
    pub usage_percent: f64,
    pub entries: usize,
}

/// Flat string map with a byte quota and change fan-out.
pub struct StorageArea {
    kind: StorageKind,
    backend: Arc<dyn StorageBackend>,
    quota_bytes: usize,
    changes: broadcast::Sender<StorageChange>,
    /// Held across read-check-write so concurrent writers see each other's usage
    writes: Mutex<()>,
}

impl StorageArea {
    pub fn new(kind: StorageKind, backend: Arc<dyn StorageBackend>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            kind,
            backend,
            quota_bytes: DEFAULT_QUOTA_BYTES,
            changes,
            writes: Mutex::new(()),
        }
    }

    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    /// Process-local area backed by memory.
    pub fn in_memory(kind: StorageKind) -> Self {
        Self::new(kind, Arc::new(MemoryBackend::new()))
    }

    pub fn session() -> Self {
        Self::in_memory(StorageKind::Session)
    }

    /// Persistent area in a sqlite file.
    pub fn open_local<P: AsRef<Path>>(path: P, pool_size: u32) -> StorageResult<Self> {
        let backend = SqliteBackend::open(path, pool_size)?;
        Ok(Self::new(StorageKind::Local, Arc::new(backend)))
    }

    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn quota_bytes(&self) -> usize {
        self.quota_bytes
    }

    pub fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.backend.get(key)
    }

    /// Stores `value` under `key` unless the area would exceed its quota.
    pub fn set_item(&self, key: &str, value: &str, origin: Uuid) -> StorageResult<()> {
        let _guard = self.writes.lock();
        let old_value = self.backend.get(key)?;
        let used = self.backend.usage_bytes()?;
        let replaced = old_value
            .as_deref()
            .map(|old| entry_size(key, old))
            .unwrap_or(0);
        let required = used.saturating_sub(replaced) + entry_size(key, value);

        if required > self.quota_bytes {
            warn!(
                key,
                required,
                quota = self.quota_bytes,
                "rejecting write over quota"
            );
            return Err(StorageError::QuotaExceeded {
                required,
                quota: self.quota_bytes,
            });
        }

        self.backend.set(key, value)?;
        self.notify(StorageChange {
            kind: self.kind,
            key: Some(key.to_string()),
            old_value,
            new_value: Some(value.to_string()),
            origin,
        });
        Ok(())
    }

    pub fn remove_item(&self, key: &str, origin: Uuid) -> StorageResult<()> {
        let _guard = self.writes.lock();
        let old_value = self.backend.get(key)?;
        self.backend.remove(key)?;
        if old_value.is_some() {
            self.notify(StorageChange {
                kind: self.kind,
                key: Some(key.to_string()),
                old_value,
                new_value: None,
                origin,
            });
        }
        Ok(())
    }

    pub fn clear(&self, origin: Uuid) -> StorageResult<()> {
        let _guard = self.writes.lock();
        self.backend.clear()?;
        self.notify(StorageChange {
            kind: self.kind,
            key: None,
            old_value: None,
            new_value: None,
            origin,
        });
        Ok(())
    }

    pub fn keys(&self) -> StorageResult<Vec<String>> {
        self.backend.keys()
    }

    /// Best-effort capacity estimate.
    pub fn estimate(&self) -> StorageResult<CapacityReport> {
        let used_bytes = self.backend.usage_bytes()?;
        let entries = self.backend.keys()?.len();
        let usage_percent = if self.quota_bytes == 0 {
            100.0
        } else {
            let pct = used_bytes as f64 / self.quota_bytes as f64 * 100.0;
            (pct * 100.0).round() / 100.0
        };
        Ok(CapacityReport {
            used_bytes,
            quota_bytes: self.quota_bytes,
            available_bytes: self.quota_bytes.saturating_sub(used_bytes),
            usage_percent,
            entries,
        })
    }

    /// Checks the area accepts writes by storing and removing a sentinel key.
    pub fn probe(&self) -> StorageResult<()> {
        let _guard = self.writes.lock();
        self.backend
            .set(PROBE_KEY, PROBE_KEY)
            .and_then(|_| self.backend.remove(PROBE_KEY))
            .map_err(|e| match e {
                StorageError::Unavailable(_) => e,
                other => StorageError::Unavailable(other.to_string()),
            })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }

    fn notify(&self, change: StorageChange) {
        // Без подписчиков send возвращает ошибку, это нормально
        if self.changes.send(change).is_err() {
            debug!(kind = %self.kind, "storage change without listeners");
        }
    }
}

impl fmt::Debug for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageArea")
            .field("kind", &self.kind)
            .field("backend", &self.backend.name())
            .field("quota_bytes", &self.quota_bytes)
            .finish()
    }
}
