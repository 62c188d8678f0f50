use crate::cache::CacheStorage;
use crate::config::CacheHandler;
use crate::error::{PwaResult, WorkerError};
use crate::worker::{RegistrationOptions, WorkerContainer, WorkerRegistration, WorkerState};
use chrono::{DateTime, Utc};
use common::HasSeverity;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

const SECONDS_PER_DAY: u64 = 60 * 60 * 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyOptions {
    pub cache_name: String,
    pub max_entries: u32,
    pub max_age_seconds: u64,
}

/// Caching rule handed to the worker with `SET_CACHE_STRATEGY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStrategy {
    pub name: String,
    /// Regex the worker matches request urls against
    pub pattern: String,
    pub handler: CacheHandler,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<StrategyOptions>,
}

impl CacheStrategy {
    /// The worker needs a name to key the route and a compilable pattern.
    pub fn validate(&self) -> PwaResult<()> {
        if self.name.trim().is_empty() {
            return Err(WorkerError::InvalidStrategy("name is empty".into()));
        }
        if self.pattern.trim().is_empty() {
            return Err(WorkerError::InvalidStrategy(format!(
                "{}: pattern is empty",
                self.name
            )));
        }
        Ok(())
    }

    pub fn static_assets() -> Self {
        Self {
            name: "static-assets".to_string(),
            pattern: r"\.(?:js|css|html|ico|png|svg)$".to_string(),
            handler: CacheHandler::CacheFirst,
            options: Some(StrategyOptions {
                cache_name: "static-assets-cache".to_string(),
                max_entries: 100,
                max_age_seconds: 365 * SECONDS_PER_DAY,
            }),
        }
    }

    pub fn images() -> Self {
        Self {
            name: "images".to_string(),
            pattern: r"\.(?:png|jpg|jpeg|svg|gif|webp)$".to_string(),
            handler: CacheHandler::CacheFirst,
            options: Some(StrategyOptions {
                cache_name: "images-cache".to_string(),
                max_entries: 50,
                max_age_seconds: 30 * SECONDS_PER_DAY,
            }),
        }
    }

    pub fn fonts() -> Self {
        Self {
            name: "fonts".to_string(),
            pattern: r"(?i)^https://fonts\.googleapis\.com/.*".to_string(),
            handler: CacheHandler::StaleWhileRevalidate,
            options: Some(StrategyOptions {
                cache_name: "google-fonts-cache".to_string(),
                max_entries: 10,
                max_age_seconds: 365 * SECONDS_PER_DAY,
            }),
        }
    }
}

/// Worker-side cache counters, as answered to `CACHE_STATS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheStats {
    pub total_size: u64,
    pub total_entries: u64,
    pub hit_rate: f64,
    pub miss_rate: f64,
    pub caches_by_name: BTreeMap<String, u64>,
    pub last_update: DateTime<Utc>,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self {
            total_size: 0,
            total_entries: 0,
            hit_rate: 0.0,
            miss_rate: 0.0,
            caches_by_name: BTreeMap::new(),
            last_update: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceWorkerSnapshot {
    pub is_registered: bool,
    pub is_active: bool,
    pub update_available: bool,
    pub cache_size: u64,
    pub last_cache_update: Option<DateTime<Utc>>,
    pub cache_version: String,
}

#[derive(Default)]
struct WorkerStatus {
    registration: Option<Arc<dyn WorkerRegistration>>,
    is_registered: bool,
    update_available: bool,
    cache_size: u64,
    last_cache_update: Option<DateTime<Utc>>,
}

impl WorkerStatus {
    fn adopt(&mut self, registration: Arc<dyn WorkerRegistration>) {
        self.update_available = registration.waiting().is_some();
        self.is_registered = true;
        self.registration = Some(registration);
    }

    /// Read from the registration on every call: the active worker moves
    /// from `Activating` to `Activated` on its own.
    fn is_active(&self) -> bool {
        self.registration.as_ref().is_some_and(|registration| {
            registration
                .active()
                .is_some_and(|worker| worker.state() == WorkerState::Activated)
        })
    }
}

/// Registration, cache bookkeeping and messaging for the offline worker.
pub struct ServiceWorkerManager {
    container: Arc<dyn WorkerContainer>,
    caches: Arc<dyn CacheStorage>,
    cache_version: String,
    status: RwLock<WorkerStatus>,
    listeners: Mutex<HashMap<ListenerId, JoinHandle<()>>>,
    next_listener: AtomicU64,
    shutdown: Notify,
}

impl ServiceWorkerManager {
    pub fn new(
        container: Arc<dyn WorkerContainer>,
        caches: Arc<dyn CacheStorage>,
        cache_version: impl Into<String>,
    ) -> Self {
        Self {
            container,
            caches,
            cache_version: cache_version.into(),
            status: RwLock::new(WorkerStatus::default()),
            listeners: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
            shutdown: Notify::new(),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.container.is_supported()
    }

    pub fn is_active(&self) -> bool {
        self.status.read().is_active()
    }

    pub fn has_registration(&self) -> bool {
        self.status.read().registration.is_some()
    }

    pub fn cache_version(&self) -> &str {
        &self.cache_version
    }

    pub fn snapshot(&self) -> ServiceWorkerSnapshot {
        let status = self.status.read();
        ServiceWorkerSnapshot {
            is_registered: status.is_registered,
            is_active: status.is_active(),
            update_available: status.update_available,
            cache_size: status.cache_size,
            last_cache_update: status.last_cache_update,
            cache_version: self.cache_version.clone(),
        }
    }

    // ----- lifecycle -----

    /// Registers the worker script. A second call returns the registration
    /// already held.
    pub async fn register(
        &self,
        script_url: &str,
        options: &RegistrationOptions,
    ) -> PwaResult<Arc<dyn WorkerRegistration>> {
        if !self.container.is_supported() {
            return Err(WorkerError::Unsupported);
        }

        let existing = self.status.read().registration.clone();
        if let Some(existing) = existing {
            debug!("service worker already registered");
            return Ok(existing);
        }

        match self.container.register(script_url, options).await {
            Ok(registration) => {
                self.status.write().adopt(registration.clone());
                info!(script_url, "service worker registered");
                Ok(registration)
            }
            Err(e) => {
                let mut status = self.status.write();
                status.is_registered = false;
                error!("Service worker registration failed: {}", e);
                Err(e)
            }
        }
    }

    pub async fn unregister(&self) -> bool {
        let Some(registration) = self.status.read().registration.clone() else {
            return false;
        };

        match registration.unregister().await {
            Ok(true) => {
                let mut status = self.status.write();
                status.registration = None;
                status.is_registered = false;
                status.update_available = false;
                status.cache_size = 0;
                info!("service worker unregistered");
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!("Service worker unregister failed: {}", e);
                false
            }
        }
    }

    /// Checks for a new script; `true` when one is waiting or installing.
    pub async fn update(&self) -> bool {
        let Some(registration) = self.status.read().registration.clone() else {
            return false;
        };

        let available = match registration.update().await {
            Ok(()) => registration.waiting().is_some() || registration.installing().is_some(),
            Err(e) => {
                warn!("Service worker update failed: {}", e);
                false
            }
        };
        self.status.write().update_available = available;
        available
    }

    pub fn skip_waiting(&self) -> PwaResult<()> {
        let waiting = self
            .status
            .read()
            .registration
            .as_ref()
            .and_then(|registration| registration.waiting());
        match waiting {
            Some(worker) => worker.post_message(json!({ "type": "SKIP_WAITING" }), None),
            None => Ok(()),
        }
    }

    /// Picks up a registration left from a previous run and measures the
    /// caches. Failures are logged and leave the manager unregistered.
    pub async fn initialize(&self) {
        if !self.container.is_supported() {
            warn!("Service worker is not supported");
            self.status.write().is_registered = false;
            return;
        }

        match self.container.get_registration().await {
            Ok(Some(registration)) => {
                self.status.write().adopt(registration);
                self.update().await;
            }
            Ok(None) => {}
            Err(e) => {
                error!("Service worker initialization failed: {}", e);
                self.status.write().is_registered = false;
            }
        }

        self.cache_size().await;
    }

    /// Stops every listener and fails messages still awaiting a reply.
    pub fn cleanup(&self) {
        let listeners: Vec<_> = self.listeners.lock().drain().collect();
        for (id, handle) in listeners {
            debug!(%id, "removing worker message listener");
            handle.abort();
        }
        self.shutdown.notify_waiters();
    }

    // ----- caches -----

    /// Total of the `content-length` of every cached response. Entries
    /// without one count as zero.
    pub async fn cache_size(&self) -> u64 {
        match self.measure_caches().await {
            Ok(total) => {
                let mut status = self.status.write();
                status.cache_size = total;
                status.last_cache_update = Some(Utc::now());
                total
            }
            Err(e) => {
                warn!("Cache size calculation failed: {}", e);
                self.status.write().cache_size = 0;
                0
            }
        }
    }

    async fn measure_caches(&self) -> PwaResult<u64> {
        let mut total = 0;
        for name in self.caches.keys().await? {
            total += self
                .caches
                .entries(&name)
                .await?
                .iter()
                .filter_map(|entry| entry.content_length)
                .sum::<u64>();
        }
        Ok(total)
    }

    pub async fn clear_cache(&self) -> bool {
        let names = match self.caches.keys().await {
            Ok(names) => names,
            Err(e) => {
                warn!("Cache clear failed: {}", e);
                return false;
            }
        };

        let mut all_deleted = true;
        for name in &names {
            let outcome = match self.caches.delete(name).await {
                Ok(true) => continue,
                Ok(false) => WorkerError::Cache(format!("{} was not deleted", name)),
                Err(e) => WorkerError::Cache(format!("{}: {}", name, e)),
            };
            outcome.log();
            all_deleted = false;
        }

        if all_deleted {
            let mut status = self.status.write();
            status.cache_size = 0;
            status.last_cache_update = Some(Utc::now());
        }
        all_deleted
    }

    pub async fn clear_cache_named(&self, cache_name: &str) -> bool {
        if cache_name.is_empty() {
            return false;
        }

        match self.caches.delete(cache_name).await {
            Ok(true) => {
                self.cache_size().await;
                true
            }
            Ok(false) => false,
            Err(e) => {
                WorkerError::Cache(format!("{}: {}", cache_name, e)).log();
                false
            }
        }
    }

    /// Adds the non-blank urls to `critical-assets-<version>`.
    pub async fn preload_critical_assets<S: AsRef<str>>(&self, urls: &[S]) -> bool {
        let urls: Vec<String> = urls
            .iter()
            .map(AsRef::as_ref)
            .filter(|url| !url.trim().is_empty())
            .map(str::to_string)
            .collect();
        if urls.is_empty() {
            return false;
        }

        let cache_name = format!("critical-assets-{}", self.cache_version);
        match self.caches.add_all(&cache_name, &urls).await {
            Ok(()) => {
                debug!(cache = %cache_name, count = urls.len(), "preloaded critical assets");
                self.cache_size().await;
                true
            }
            Err(e) => {
                WorkerError::Cache(format!("{}: {}", cache_name, e)).log();
                false
            }
        }
    }

    // ----- messaging -----

    /// Posts `message` to the controlling worker and waits for its reply.
    pub async fn send_message(&self, message: Value, timeout: Duration) -> PwaResult<Value> {
        let controller = self.container.controller().ok_or(WorkerError::NoController)?;

        // Подписка на cleanup до отправки, чтобы не пропустить notify_waiters
        let cancelled = self.shutdown.notified();
        let (reply_tx, reply_rx) = oneshot::channel();
        controller.post_message(message, Some(reply_tx))?;

        tokio::select! {
            reply = tokio::time::timeout(timeout, reply_rx) => match reply {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(_)) => Err(WorkerError::ChannelClosed),
                Err(_) => Err(WorkerError::Timeout(timeout.as_millis() as u64)),
            },
            _ = cancelled => Err(WorkerError::Cancelled),
        }
    }

    /// Calls `handler` with every message posted by the controlling worker.
    /// Messages from other workers are ignored.
    pub fn listen<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        let container = self.container.clone();
        let mut messages = container.messages();

        let handle = tokio::spawn(async move {
            loop {
                match messages.recv().await {
                    Ok(message) => {
                        let controller = container.controller();
                        let from_controller = match (&message.source, &controller) {
                            (Some(source), Some(controller)) => source == controller.id(),
                            _ => false,
                        };
                        if from_controller {
                            handler(message.data);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "worker message listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        self.listeners.lock().insert(id, handle);
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        match self.listeners.lock().remove(&id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    // ----- offline strategy -----

    pub async fn set_cache_strategy(&self, strategy: &CacheStrategy) -> bool {
        let payload = strategy
            .validate()
            .and_then(|()| serde_json::to_value(strategy).map_err(WorkerError::from));
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                e.log();
                return false;
            }
        };

        let message = json!({ "type": "SET_CACHE_STRATEGY", "payload": payload });
        match self.send_message(message, DEFAULT_MESSAGE_TIMEOUT).await {
            Ok(_) => {
                info!(strategy = %strategy.name, handler = %strategy.handler, "cache strategy set");
                true
            }
            Err(e) => {
                e.log();
                false
            }
        }
    }

    /// Asks the worker for its cache counters; zeroed stats when it can't
    /// answer.
    pub async fn cache_stats(&self) -> CacheStats {
        let reply = self
            .send_message(json!({ "type": "CACHE_STATS" }), DEFAULT_MESSAGE_TIMEOUT)
            .await
            .and_then(|reply| serde_json::from_value(reply).map_err(WorkerError::from));

        match reply {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Cache stats unavailable: {}", e);
                CacheStats::default()
            }
        }
    }
}

impl Drop for ServiceWorkerManager {
    fn drop(&mut self) {
        for (_, handle) in self.listeners.get_mut().drain() {
            handle.abort();
        }
    }
}

impl fmt::Debug for ServiceWorkerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceWorkerManager")
            .field("cache_version", &self.cache_version)
            .field("snapshot", &self.snapshot())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_requires_name_and_pattern() {
        assert!(CacheStrategy::fonts().validate().is_ok());

        let mut unnamed = CacheStrategy::images();
        unnamed.name = "  ".into();
        assert!(matches!(unnamed.validate(), Err(WorkerError::InvalidStrategy(_))));

        let mut open = CacheStrategy::images();
        open.pattern.clear();
        let err = open.validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid cache strategy: images: pattern is empty");
    }

    #[test]
    fn strategy_presets_serialize_for_the_worker() {
        let value = serde_json::to_value(CacheStrategy::images()).unwrap();
        assert_eq!(value["name"], "images");
        assert_eq!(value["handler"], "cacheFirst");
        assert_eq!(value["options"]["cacheName"], "images-cache");
        assert_eq!(value["options"]["maxAgeSeconds"], 30 * 24 * 3600);
    }

    #[test]
    fn stats_accept_partial_replies() {
        let stats: CacheStats =
            serde_json::from_value(json!({"totalSize": 2048, "hitRate": 0.75})).unwrap();
        assert_eq!(stats.total_size, 2048);
        assert_eq!(stats.total_entries, 0);
        assert!((stats.hit_rate - 0.75).abs() < f64::EPSILON);
        assert!(stats.caches_by_name.is_empty());
    }
}
