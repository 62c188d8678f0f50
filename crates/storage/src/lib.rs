//! Versioned key/value storage.
//!
//! A [`StorageArea`] is a flat string map (the persistent "local" area or a
//! per-process "session" area) with a byte quota and change notifications.
//! [`VersionedStore`] is a typed handle over one key of an area: it wraps
//! values in a JSON envelope carrying a schema version, a write timestamp and
//! an optional expiry, and keeps an in-memory copy that other handles can
//! keep in sync with.

pub mod area;
pub mod backend;
pub mod envelope;
pub mod error;
pub mod sqlite;
pub mod store;

pub use area::{CapacityReport, StorageArea, StorageChange, StorageKind, DEFAULT_QUOTA_BYTES};
pub use backend::{MemoryBackend, StorageBackend};
pub use envelope::{is_version_compatible, Envelope};
pub use error::{StorageError, StorageResult};
pub use sqlite::SqliteBackend;
pub use store::{StoreOptions, StoreStatus, StoreUpdate, VersionedStore};

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
