//! Offline app lifecycle: install prompt choreography, persisted app
//! state, and service worker registration, caching and messaging.
//!
//! Platform pieces (the deferred install prompt, notification permissions,
//! the worker container and the cache storage) are traits so the logic here
//! runs the same against a real host or an in-process double.

pub mod cache;
pub mod config;
pub mod error;
pub mod install;
pub mod service_worker;
pub mod state;
pub mod worker;

pub use cache::{CacheEntry, CacheStorage, MemoryCacheStorage};
pub use config::{CacheHandler, PwaConfig};
pub use error::{PwaResult, WorkerError};
pub use install::{DeferredPrompt, InstallManager, InstallOutcome, NotificationPermissions, Permission};
pub use service_worker::{
    CacheStats, CacheStrategy, ListenerId, ServiceWorkerManager, ServiceWorkerSnapshot,
    StrategyOptions, DEFAULT_MESSAGE_TIMEOUT,
};
pub use state::{PwaEvent, PwaState, PWA_STATE_KEY};
pub use worker::{
    RegistrationOptions, WorkerContainer, WorkerController, WorkerMessage, WorkerRegistration,
    WorkerState,
};
