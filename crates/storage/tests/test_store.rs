use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use storage::{
    StorageArea, StorageBackend, StorageError, StorageKind, StorageResult, StoreOptions,
    VersionedStore,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Settings {
    theme: String,
    font_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            font_size: 14,
        }
    }
}

fn session() -> Arc<StorageArea> {
    Arc::new(StorageArea::session())
}

fn settings_store(area: &Arc<StorageArea>, options: StoreOptions<Settings>) -> VersionedStore<Settings> {
    VersionedStore::new(area.clone(), "settings", Settings::default(), options)
}

/// Backend that refuses every operation.
struct BrokenBackend;

impl StorageBackend for BrokenBackend {
    fn name(&self) -> &'static str {
        "broken"
    }
    fn get(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(StorageError::Backend("disk gone".into()))
    }
    fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(StorageError::Backend("disk gone".into()))
    }
    fn remove(&self, _key: &str) -> StorageResult<()> {
        Err(StorageError::Backend("disk gone".into()))
    }
    fn clear(&self) -> StorageResult<()> {
        Err(StorageError::Backend("disk gone".into()))
    }
    fn keys(&self) -> StorageResult<Vec<String>> {
        Err(StorageError::Backend("disk gone".into()))
    }
}

#[test]
fn test_load_returns_saved_value() {
    let area = session();
    let writer = settings_store(&area, StoreOptions::default());
    let dark = Settings {
        theme: "dark".into(),
        font_size: 16,
    };
    writer.save(dark.clone()).unwrap();

    let reader = settings_store(&area, StoreOptions::default());
    assert_eq!(reader.value(), dark);
    assert_eq!(reader.read(), Some(dark));
    assert!(reader.error().is_none());
}

#[test]
fn test_missing_key_gives_default_without_error() {
    let area = session();
    let store = settings_store(&area, StoreOptions::default());
    assert_eq!(store.read(), None);
    assert_eq!(store.load(), Settings::default());
    assert!(store.error().is_none());
}

#[test]
fn test_expired_record_is_removed_on_load() {
    let area = session();
    let raw = json!({
        "_version": "1.0",
        "data": {"theme": "dark", "font_size": 20},
        "timestamp": 1,
        "expireAt": 2
    });
    area.set_item("settings", &raw.to_string(), Uuid::new_v4()).unwrap();

    let store = settings_store(&area, StoreOptions::default());
    assert_eq!(store.value(), Settings::default());
    assert!(area.get_item("settings").unwrap().is_none());
}

#[test]
fn test_ttl_writes_expiry() {
    let area = session();
    let store = settings_store(&area, StoreOptions::default().with_ttl(Duration::from_secs(60)));
    store.save(Settings::default()).unwrap();

    let record: Value = serde_json::from_str(&area.get_item("settings").unwrap().unwrap()).unwrap();
    let timestamp = record["timestamp"].as_i64().unwrap();
    let expire_at = record["expireAt"].as_i64().unwrap();
    assert_eq!(expire_at - timestamp, 60_000);
    assert!(store.read().is_some());
}

#[test]
fn test_huge_ttl_saturates_instead_of_expiring() {
    let area = session();
    for ttl in [Duration::MAX, Duration::from_millis(i64::MAX as u64)] {
        let store = settings_store(&area, StoreOptions::default().with_ttl(ttl));
        let value = Settings {
            theme: "dark".into(),
            font_size: 7,
        };
        store.save(value.clone()).unwrap();

        let record: Value = serde_json::from_str(&area.get_item("settings").unwrap().unwrap()).unwrap();
        assert_eq!(record["expireAt"].as_i64(), Some(i64::MAX));
        assert_eq!(store.read(), Some(value));
    }
}

#[test]
fn test_incompatible_major_version_falls_back_to_default() {
    let area = session();
    let old = settings_store(&area, StoreOptions::default().with_version("1.4"));
    old.save(Settings {
        theme: "dark".into(),
        font_size: 11,
    })
    .unwrap();

    let same_major = settings_store(&area, StoreOptions::default().with_version("1.0"));
    assert_eq!(same_major.value().theme, "dark");

    let next_major = settings_store(&area, StoreOptions::default().with_version("2.0"));
    assert_eq!(next_major.value(), Settings::default());
    assert!(next_major.error().is_none());
    // incompatible records are left in place
    assert!(area.get_item("settings").unwrap().is_some());
}

#[test]
fn test_corrupt_record_reports_parse_error() {
    let area = session();
    area.set_item("settings", "{not json", Uuid::new_v4()).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let store = settings_store(
        &area,
        StoreOptions::default().with_error_handler(move |e| sink.lock().push(e.to_string())),
    );

    assert_eq!(store.value(), Settings::default());
    let error = store.error().unwrap();
    assert!(error.starts_with("parse failed"), "{error}");
    assert_eq!(seen.lock().len(), 1);
}

#[test]
fn test_validator_blocks_write() {
    let area = session();
    let store = settings_store(
        &area,
        StoreOptions::default().with_validator(|s: &Settings| s.font_size >= 8),
    );

    let err = store
        .save(Settings {
            theme: "tiny".into(),
            font_size: 2,
        })
        .unwrap_err();
    assert!(matches!(err, StorageError::Validation(ref key) if key == "settings"));
    assert!(store.error().unwrap().contains("validation failed"));
    assert!(area.get_item("settings").unwrap().is_none());
    assert_eq!(store.value(), Settings::default());

    // a good write clears the error
    store.save(Settings::default()).unwrap();
    assert!(store.error().is_none());
}

#[test]
fn test_quota_exceeded_keeps_previous_value() {
    let area = Arc::new(StorageArea::session().with_quota(128));
    let store = settings_store(&area, StoreOptions::default());
    store.save(Settings::default()).unwrap();

    let err = store
        .save(Settings {
            theme: "x".repeat(200),
            font_size: 14,
        })
        .unwrap_err();
    assert!(err.is_quota_exceeded());
    assert!(store.error().unwrap().contains("storage quota exceeded"));
    assert_eq!(store.value(), Settings::default());
    assert_eq!(store.read(), Some(Settings::default()));
}

#[test]
fn test_remove_and_clear_area() {
    let area = session();
    let store = settings_store(&area, StoreOptions::default());
    let other = VersionedStore::new(area.clone(), "other", 0u32, StoreOptions::default());

    store
        .save(Settings {
            theme: "dark".into(),
            font_size: 12,
        })
        .unwrap();
    other.save(7).unwrap();

    store.remove().unwrap();
    assert_eq!(store.value(), Settings::default());
    assert!(area.get_item("settings").unwrap().is_none());
    assert!(area.get_item("other").unwrap().is_some());

    store.clear_area().unwrap();
    assert!(area.keys().unwrap().is_empty());
}

#[test]
fn test_unavailable_backend_marks_store_unsupported() {
    let area = Arc::new(StorageArea::new(StorageKind::Local, Arc::new(BrokenBackend)));
    let store = settings_store(&area, StoreOptions::default());

    assert!(!store.is_supported());
    assert!(store.error().unwrap().starts_with("storage unavailable"));
    assert_eq!(store.value(), Settings::default());
    assert!(store.save(Settings::default()).is_err());
}

#[test]
fn test_version_check_on_raw_records() {
    let area = session();
    let store = settings_store(&area, StoreOptions::default().with_version("3.1"));
    assert!(store.is_version_compatible(&json!({"_version": "3.0", "data": {}})));
    assert!(!store.is_version_compatible(&json!({"data": {}})));
}

#[tokio::test]
async fn test_sync_picks_up_writes_from_other_handles() {
    let area = session();
    let watcher = Arc::new(settings_store(&area, StoreOptions::default()));
    let _sync = watcher.spawn_sync();
    let mut rx = watcher.subscribe();

    let writer = settings_store(&area, StoreOptions::default());
    let dark = Settings {
        theme: "dark".into(),
        font_size: 18,
    };
    writer.save(dark.clone()).unwrap();

    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| *s == dark))
        .await
        .expect("sync timed out")
        .unwrap();

    writer.clear_area().unwrap();
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| *s == Settings::default()))
        .await
        .expect("sync timed out")
        .unwrap();
}

#[tokio::test]
async fn test_sync_ignores_other_keys() {
    let area = session();
    let watcher = Arc::new(settings_store(&area, StoreOptions::default()));
    let _sync = watcher.spawn_sync();
    let mut updates = watcher.updates();

    let other = VersionedStore::new(area.clone(), "unrelated", 0u32, StoreOptions::default());
    other.save(5).unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(updates.try_recv().is_err());
}
