#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use pwa::{
    CacheEntry, CacheStorage, DeferredPrompt, InstallOutcome, MemoryCacheStorage, NotificationPermissions, Permission, PwaResult,
    RegistrationOptions, WorkerContainer, WorkerController, WorkerError, WorkerMessage,
    WorkerRegistration, WorkerState,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};

/// How a fake worker answers messages that expect a reply.
#[derive(Clone)]
pub enum Reply {
    With(Value),
    /// Keeps the reply channel open and never answers
    Never,
    /// Drops the reply channel
    Drop,
}

pub struct FakeWorker {
    id: String,
    state: Mutex<WorkerState>,
    reply: Mutex<Reply>,
    pub posted: Mutex<Vec<Value>>,
    pending: Mutex<Vec<oneshot::Sender<Value>>>,
}

impl FakeWorker {
    pub fn new(id: &str, state: WorkerState) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            state: Mutex::new(state),
            reply: Mutex::new(Reply::Drop),
            posted: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(self: Arc<Self>, reply: Reply) -> Arc<Self> {
        *self.reply.lock() = reply;
        self
    }

    /// Moves the worker along its lifecycle, as the host would.
    pub fn set_state(&self, state: WorkerState) {
        *self.state.lock() = state;
    }

    pub fn posted_types(&self) -> Vec<String> {
        self.posted
            .lock()
            .iter()
            .filter_map(|m| m["type"].as_str().map(str::to_string))
            .collect()
    }
}

impl WorkerController for FakeWorker {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    fn post_message(&self, message: Value, reply: Option<oneshot::Sender<Value>>) -> PwaResult<()> {
        self.posted.lock().push(message);
        if let Some(reply) = reply {
            match self.reply.lock().clone() {
                Reply::With(value) => {
                    let _ = reply.send(value);
                }
                Reply::Never => self.pending.lock().push(reply),
                Reply::Drop => {}
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRegistration {
    pub installing: Mutex<Option<Arc<FakeWorker>>>,
    pub waiting: Mutex<Option<Arc<FakeWorker>>>,
    pub active: Mutex<Option<Arc<FakeWorker>>>,
    /// Worker that shows up as waiting after the next `update`
    pub next_version: Mutex<Option<Arc<FakeWorker>>>,
    pub fail_update: Mutex<bool>,
    pub unregister_result: Mutex<Option<bool>>,
    pub update_calls: AtomicUsize,
}

impl FakeRegistration {
    pub fn active(worker: Arc<FakeWorker>) -> Arc<Self> {
        let registration = Self::default();
        *registration.active.lock() = Some(worker);
        *registration.unregister_result.lock() = Some(true);
        Arc::new(registration)
    }
}

fn as_controller(worker: &Option<Arc<FakeWorker>>) -> Option<Arc<dyn WorkerController>> {
    worker.clone().map(|w| w as Arc<dyn WorkerController>)
}

#[async_trait]
impl WorkerRegistration for FakeRegistration {
    fn installing(&self) -> Option<Arc<dyn WorkerController>> {
        as_controller(&self.installing.lock())
    }

    fn waiting(&self) -> Option<Arc<dyn WorkerController>> {
        as_controller(&self.waiting.lock())
    }

    fn active(&self) -> Option<Arc<dyn WorkerController>> {
        as_controller(&self.active.lock())
    }

    async fn update(&self) -> PwaResult<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_update.lock() {
            return Err(WorkerError::Registration("script fetch failed".into()));
        }
        if let Some(next) = self.next_version.lock().take() {
            *self.waiting.lock() = Some(next);
        }
        Ok(())
    }

    async fn unregister(&self) -> PwaResult<bool> {
        match *self.unregister_result.lock() {
            Some(result) => Ok(result),
            None => Err(WorkerError::Registration("unregister failed".into())),
        }
    }
}

pub struct FakeContainer {
    pub supported: bool,
    pub registration: Mutex<Option<Arc<FakeRegistration>>>,
    /// Handed out by the next `register` call
    pub to_register: Mutex<Option<Arc<FakeRegistration>>>,
    pub controller: Mutex<Option<Arc<FakeWorker>>>,
    pub messages: broadcast::Sender<WorkerMessage>,
    pub register_calls: AtomicUsize,
}

impl FakeContainer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            registration: Mutex::new(None),
            to_register: Mutex::new(None),
            controller: Mutex::new(None),
            messages: broadcast::channel(16).0,
            register_calls: AtomicUsize::new(0),
        })
    }

    pub fn unsupported() -> Arc<Self> {
        Arc::new(Self {
            supported: false,
            registration: Mutex::new(None),
            to_register: Mutex::new(None),
            controller: Mutex::new(None),
            messages: broadcast::channel(16).0,
            register_calls: AtomicUsize::new(0),
        })
    }

    pub fn with_controller(self: Arc<Self>, worker: Arc<FakeWorker>) -> Arc<Self> {
        *self.controller.lock() = Some(worker);
        self
    }

    pub fn with_registration(self: Arc<Self>, registration: Arc<FakeRegistration>) -> Arc<Self> {
        *self.registration.lock() = Some(registration);
        self
    }

    pub fn post_from(&self, source: &str, data: Value) {
        let _ = self.messages.send(WorkerMessage {
            source: Some(source.to_string()),
            data,
        });
    }
}

#[async_trait]
impl WorkerContainer for FakeContainer {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn register(
        &self,
        _script_url: &str,
        _options: &RegistrationOptions,
    ) -> PwaResult<Arc<dyn WorkerRegistration>> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        let registration = self
            .to_register
            .lock()
            .take()
            .ok_or_else(|| WorkerError::Registration("script not found".into()))?;
        *self.registration.lock() = Some(registration.clone());
        Ok(registration)
    }

    async fn get_registration(&self) -> PwaResult<Option<Arc<dyn WorkerRegistration>>> {
        Ok(self
            .registration
            .lock()
            .clone()
            .map(|r| r as Arc<dyn WorkerRegistration>))
    }

    fn controller(&self) -> Option<Arc<dyn WorkerController>> {
        as_controller(&self.controller.lock())
    }

    fn messages(&self) -> broadcast::Receiver<WorkerMessage> {
        self.messages.subscribe()
    }
}

pub struct FakePrompt {
    pub outcome: Option<InstallOutcome>,
    pub prompts: AtomicUsize,
}

impl FakePrompt {
    pub fn answering(outcome: InstallOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome: Some(outcome),
            prompts: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            outcome: None,
            prompts: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl DeferredPrompt for FakePrompt {
    async fn prompt(&self) -> PwaResult<()> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            Some(_) => Ok(()),
            None => Err(WorkerError::Prompt("prompt already used".into())),
        }
    }

    async fn user_choice(&self) -> PwaResult<InstallOutcome> {
        self.outcome
            .ok_or_else(|| WorkerError::Prompt("no choice".into()))
    }
}

pub struct FakePermissions {
    pub supported: bool,
    pub current: Permission,
    pub answer: Permission,
    /// When set, `request` fails with this message
    pub failure: Option<String>,
    pub requests: AtomicUsize,
}

impl FakePermissions {
    pub fn new(current: Permission, answer: Permission) -> Self {
        Self {
            supported: true,
            current,
            answer,
            failure: None,
            requests: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl NotificationPermissions for FakePermissions {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn current(&self) -> Permission {
        self.current
    }

    async fn request(&self) -> PwaResult<Permission> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(WorkerError::Permission(message.clone())),
            None => Ok(self.answer),
        }
    }
}

/// Cache storage that reads fine but refuses to delete or add.
#[derive(Default)]
pub struct ReadOnlyCaches {
    pub inner: MemoryCacheStorage,
}

#[async_trait]
impl CacheStorage for ReadOnlyCaches {
    async fn keys(&self) -> PwaResult<Vec<String>> {
        self.inner.keys().await
    }

    async fn entries(&self, cache_name: &str) -> PwaResult<Vec<CacheEntry>> {
        self.inner.entries(cache_name).await
    }

    async fn delete(&self, _cache_name: &str) -> PwaResult<bool> {
        Err(WorkerError::Cache("storage is read-only".into()))
    }

    async fn add_all(&self, _cache_name: &str, _urls: &[String]) -> PwaResult<()> {
        Err(WorkerError::Cache("storage is read-only".into()))
    }
}
