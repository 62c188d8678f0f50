use crate::area::StorageArea;
use crate::envelope::{self, Decoded, Envelope};
use crate::error::{StorageError, StorageResult};
use crate::now_ms;
use common::HasSeverity;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

pub type Validator<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
pub type ErrorHandler = Arc<dyn Fn(&StorageError) + Send + Sync>;

/// Per-key policy of a [`VersionedStore`].
pub struct StoreOptions<T> {
    /// Schema version written into every record; only the major part is
    /// compared on read.
    pub version: String,
    /// Records older than this are dropped on read.
    pub expire_after: Option<Duration>,
    /// Writes of values for which this returns `false` are rejected.
    pub validator: Option<Validator<T>>,
    /// Called for every failure in addition to recording it in the status.
    pub error_handler: Option<ErrorHandler>,
}

impl<T> Default for StoreOptions<T> {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            expire_after: None,
            validator: None,
            error_handler: None,
        }
    }
}

impl<T> Clone for StoreOptions<T> {
    fn clone(&self) -> Self {
        Self {
            version: self.version.clone(),
            expire_after: self.expire_after,
            validator: self.validator.clone(),
            error_handler: self.error_handler.clone(),
        }
    }
}

impl<T> StoreOptions<T> {
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expire_after = Some(ttl);
        self
    }

    pub fn with_validator(mut self, validator: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn with_error_handler(
        mut self,
        handler: impl Fn(&StorageError) + Send + Sync + 'static,
    ) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatus {
    pub loading: bool,
    /// Message of the last failure, cleared by the next successful load/save
    pub error: Option<String>,
    pub supported: bool,
}

impl Default for StoreStatus {
    fn default() -> Self {
        Self {
            loading: false,
            error: None,
            supported: true,
        }
    }
}

/// Value transition published to [`VersionedStore::updates`] subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreUpdate<T> {
    pub old: T,
    pub new: T,
}

/// Typed handle over one key of a [`StorageArea`].
///
/// Keeps the current value in memory; reads never fail, they fall back to
/// the default and record what went wrong in [`StoreStatus`].
pub struct VersionedStore<T> {
    key: String,
    area: Arc<StorageArea>,
    options: StoreOptions<T>,
    default: T,
    origin: Uuid,
    value: watch::Sender<T>,
    updates: broadcast::Sender<StoreUpdate<T>>,
    status: RwLock<StoreStatus>,
}

impl<T> VersionedStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates the handle and loads the stored value.
    pub fn new(
        area: Arc<StorageArea>,
        key: impl Into<String>,
        default: T,
        options: StoreOptions<T>,
    ) -> Self {
        let (value, _) = watch::channel(default.clone());
        let (updates, _) = broadcast::channel(64);
        let store = Self {
            key: key.into(),
            area,
            options,
            default,
            origin: Uuid::new_v4(),
            value,
            updates,
            status: RwLock::new(StoreStatus::default()),
        };
        store.init();
        store
    }

    /// Checks the area is usable and loads the current value.
    pub fn init(&self) {
        match self.area.probe() {
            Ok(()) => {
                self.status.write().supported = true;
                self.load();
            }
            Err(e) => {
                self.status.write().supported = false;
                self.report(&e);
            }
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn origin(&self) -> Uuid {
        self.origin
    }

    pub fn area(&self) -> &Arc<StorageArea> {
        &self.area
    }

    pub fn version(&self) -> &str {
        &self.options.version
    }

    /// Current in-memory value.
    pub fn value(&self) -> T {
        self.value.borrow().clone()
    }

    pub fn status(&self) -> StoreStatus {
        self.status.read().clone()
    }

    pub fn is_supported(&self) -> bool {
        self.status.read().supported
    }

    pub fn error(&self) -> Option<String> {
        self.status.read().error.clone()
    }

    pub fn is_version_compatible(&self, record: &Value) -> bool {
        envelope::is_version_compatible(record, &self.options.version)
    }

    /// Stored value, or `None` when the key is missing, unreadable,
    /// incompatible or expired. Does not touch the in-memory value.
    pub fn read(&self) -> Option<T> {
        match self.area.get_item(&self.key) {
            Ok(Some(raw)) => match envelope::decode(&raw, &self.options.version, now_ms()) {
                Decoded::Fresh(value) => Some(value),
                _ => None,
            },
            Ok(None) => None,
            Err(e) => {
                debug!(key = %self.key, error = %e, "read failed");
                None
            }
        }
    }

    /// Loads the stored value into memory, falling back to the default.
    /// Expired records are deleted.
    #[instrument(skip(self), fields(key = %self.key))]
    pub fn load(&self) -> T {
        self.status.write().loading = true;

        let loaded = match self.area.get_item(&self.key) {
            Ok(None) => {
                self.clear_error();
                self.default.clone()
            }
            Ok(Some(raw)) => match envelope::decode(&raw, &self.options.version, now_ms()) {
                Decoded::Fresh(value) => {
                    self.clear_error();
                    value
                }
                Decoded::Expired => {
                    debug!("record expired, removing");
                    match self.area.remove_item(&self.key, self.origin) {
                        Ok(()) => self.clear_error(),
                        Err(e) => self.report(&e),
                    }
                    self.default.clone()
                }
                Decoded::Incompatible => {
                    debug!("discarding record with incompatible schema version");
                    self.default.clone()
                }
                Decoded::Corrupt(reason) => {
                    self.report(&StorageError::Parse(reason));
                    self.default.clone()
                }
            },
            Err(e) => {
                self.report(&e);
                self.default.clone()
            }
        };

        self.status.write().loading = false;
        self.replace_value(loaded.clone());
        loaded
    }

    /// Validates, wraps and writes `value`. On success the in-memory value
    /// and all subscribers see it.
    #[instrument(skip(self, value), fields(key = %self.key))]
    pub fn save(&self, value: T) -> StorageResult<()> {
        if let Some(validator) = &self.options.validator {
            if !validator(&value) {
                let err = StorageError::Validation(self.key.clone());
                self.report(&err);
                return Err(err);
            }
        }

        let now = now_ms();
        let envelope = Envelope {
            version: self.options.version.clone(),
            data: &value,
            timestamp: now,
            expire_at: self.options.expire_after.map(|ttl| expiry_after(now, ttl)),
        };

        let result = serde_json::to_string(&envelope)
            .map_err(|e| StorageError::Serialization(e.to_string()))
            .and_then(|raw| self.area.set_item(&self.key, &raw, self.origin));

        match result {
            Ok(()) => {
                self.clear_error();
                self.replace_value(value);
                Ok(())
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Deletes the key; the in-memory value returns to the default.
    pub fn remove(&self) -> StorageResult<()> {
        if let Err(e) = self.area.remove_item(&self.key, self.origin) {
            self.report(&e);
            return Err(e);
        }
        self.clear_error();
        self.replace_value(self.default.clone());
        Ok(())
    }

    /// Clears the whole area, not just this key.
    pub fn clear_area(&self) -> StorageResult<()> {
        if let Err(e) = self.area.clear(self.origin) {
            self.report(&e);
            return Err(e);
        }
        self.clear_error();
        self.replace_value(self.default.clone());
        Ok(())
    }

    /// Replaces the in-memory value without writing it. Subscribers are
    /// notified as for a save.
    pub fn set_in_memory(&self, value: T) {
        self.replace_value(value);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.value.subscribe()
    }

    pub fn updates(&self) -> broadcast::Receiver<StoreUpdate<T>> {
        self.updates.subscribe()
    }

    /// Reloads the value whenever another handle writes this key or clears
    /// the area. The task ends when the store is dropped.
    pub fn spawn_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.area.subscribe();
        let weak: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                let reload = match changes.recv().await {
                    Ok(change) => match weak.upgrade() {
                        Some(store) => {
                            (change.origin != store.origin && change.affects(&store.key))
                                .then_some(store)
                        }
                        None => break,
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "storage sync lagged, reloading");
                        match weak.upgrade() {
                            Some(store) => Some(store),
                            None => break,
                        }
                    }
                    Err(RecvError::Closed) => break,
                };

                if let Some(store) = reload {
                    debug!(key = %store.key, "reloading after external change");
                    store.load();
                }
            }
        })
    }

    fn replace_value(&self, new: T) {
        let old = self.value.send_replace(new.clone());
        // Подписчиков может не быть
        let _ = self.updates.send(StoreUpdate { old, new });
    }

    fn clear_error(&self) {
        self.status.write().error = None;
    }

    fn report(&self, err: &StorageError) {
        let _span = tracing::debug_span!("store", key = %self.key).entered();
        err.log();
        self.status.write().error = Some(err.to_string());
        if let Some(handler) = &self.options.error_handler {
            handler(err);
        }
    }
}

/// `now + ttl` in ms, saturating at `i64::MAX` for ttls beyond the range.
fn expiry_after(now: i64, ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis())
        .ok()
        .and_then(|ms| now.checked_add(ms))
        .unwrap_or(i64::MAX)
}

impl<T> fmt::Debug for VersionedStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedStore")
            .field("key", &self.key)
            .field("version", &self.options.version)
            .field("area", &self.area)
            .field("status", &*self.status.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        count: u32,
    }

    fn store(area: &Arc<StorageArea>) -> VersionedStore<Counter> {
        VersionedStore::new(area.clone(), "counter", Counter { count: 0 }, StoreOptions::default())
    }

    #[test]
    fn initial_state() {
        let area = Arc::new(StorageArea::session());
        let store = store(&area);
        assert_eq!(store.value(), Counter { count: 0 });
        assert_eq!(store.status(), StoreStatus::default());
        assert!(store.is_supported());
    }

    #[test]
    fn save_writes_envelope() {
        let area = Arc::new(StorageArea::session());
        let store = store(&area);
        store.save(Counter { count: 3 }).unwrap();

        let raw = area.get_item("counter").unwrap().unwrap();
        let record: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(record["_version"], "1.0");
        assert_eq!(record["data"]["count"], 3);
        assert!(record["timestamp"].is_i64());
        assert!(record.get("expireAt").is_none());
        assert_eq!(store.value().count, 3);
    }

    #[test]
    fn watchers_see_old_and_new() {
        let area = Arc::new(StorageArea::session());
        let store = store(&area);
        let mut updates = store.updates();
        let watch = store.subscribe();

        store.save(Counter { count: 1 }).unwrap();

        let update = updates.try_recv().unwrap();
        assert_eq!(update.old, Counter { count: 0 });
        assert_eq!(update.new, Counter { count: 1 });
        assert_eq!(watch.borrow().count, 1);
    }

    #[test]
    fn expiry_saturates() {
        assert_eq!(expiry_after(1_000, Duration::from_secs(1)), 2_000);
        assert_eq!(expiry_after(1_000, Duration::MAX), i64::MAX);
        assert_eq!(expiry_after(1_000, Duration::from_millis(i64::MAX as u64)), i64::MAX);
    }
}
