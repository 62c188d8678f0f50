use crate::error::PwaResult;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub url: String,
    /// Value of the `content-length` header, if the response had one
    pub content_length: Option<u64>,
}

/// Named response caches (`CacheStorage` in a browser).
#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn keys(&self) -> PwaResult<Vec<String>>;

    async fn entries(&self, cache_name: &str) -> PwaResult<Vec<CacheEntry>>;

    /// `Ok(false)` when no such cache existed.
    async fn delete(&self, cache_name: &str) -> PwaResult<bool>;

    /// Fetches and stores every url, creating the cache if needed.
    async fn add_all(&self, cache_name: &str, urls: &[String]) -> PwaResult<()>;
}

/// In-process cache storage. `add_all` records urls without fetching them,
/// so their size is unknown.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: RwLock<BTreeMap<String, BTreeMap<String, Option<u64>>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, cache_name: &str, url: &str, content_length: Option<u64>) {
        self.caches
            .write()
            .entry(cache_name.to_string())
            .or_default()
            .insert(url.to_string(), content_length);
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn keys(&self) -> PwaResult<Vec<String>> {
        Ok(self.caches.read().keys().cloned().collect())
    }

    async fn entries(&self, cache_name: &str) -> PwaResult<Vec<CacheEntry>> {
        Ok(self
            .caches
            .read()
            .get(cache_name)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(url, content_length)| CacheEntry {
                        url: url.clone(),
                        content_length: *content_length,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, cache_name: &str) -> PwaResult<bool> {
        Ok(self.caches.write().remove(cache_name).is_some())
    }

    async fn add_all(&self, cache_name: &str, urls: &[String]) -> PwaResult<()> {
        let mut caches = self.caches.write();
        let cache = caches.entry(cache_name.to_string()).or_default();
        for url in urls {
            cache.entry(url.clone()).or_insert(None);
        }
        Ok(())
    }
}
