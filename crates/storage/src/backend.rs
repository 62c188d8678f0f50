use crate::error::StorageResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Flat string map a [`crate::StorageArea`] is built on.
///
/// Implementations do no policy work: quota, versioning and notifications
/// live above this trait.
pub trait StorageBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    fn clear(&self) -> StorageResult<()>;

    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Bytes held by all entries, keys included.
    fn usage_bytes(&self) -> StorageResult<usize> {
        let mut total = 0;
        for key in self.keys()? {
            if let Some(value) = self.get(&key)? {
                total += entry_size(&key, &value);
            }
        }
        Ok(total)
    }
}

pub(crate) fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// In-process backend. Backs the session area and tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.entries.write().clear();
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn usage_bytes(&self) -> StorageResult<usize> {
        Ok(self
            .entries
            .read()
            .iter()
            .map(|(k, v)| entry_size(k, v))
            .sum())
    }
}
