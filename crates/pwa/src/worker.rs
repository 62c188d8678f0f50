use crate::error::PwaResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationOptions {
    pub scope: Option<String>,
}

/// Message posted by a worker to the page. `source` is the sending
/// worker's id.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerMessage {
    pub source: Option<String>,
    pub data: Value,
}

/// A single worker script instance.
pub trait WorkerController: Send + Sync {
    fn id(&self) -> &str;

    fn state(&self) -> WorkerState;

    /// Posts `message`; when `reply` is given the worker answers through it.
    fn post_message(&self, message: Value, reply: Option<oneshot::Sender<Value>>) -> PwaResult<()>;
}

#[async_trait]
pub trait WorkerRegistration: Send + Sync {
    fn installing(&self) -> Option<Arc<dyn WorkerController>>;

    fn waiting(&self) -> Option<Arc<dyn WorkerController>>;

    fn active(&self) -> Option<Arc<dyn WorkerController>>;

    /// Re-fetches the script; a changed script shows up as installing/waiting.
    async fn update(&self) -> PwaResult<()>;

    async fn unregister(&self) -> PwaResult<bool>;
}

/// The host's worker registry (`navigator.serviceWorker` in a browser).
#[async_trait]
pub trait WorkerContainer: Send + Sync {
    fn is_supported(&self) -> bool;

    async fn register(
        &self,
        script_url: &str,
        options: &RegistrationOptions,
    ) -> PwaResult<Arc<dyn WorkerRegistration>>;

    async fn get_registration(&self) -> PwaResult<Option<Arc<dyn WorkerRegistration>>>;

    /// Worker currently controlling the page.
    fn controller(&self) -> Option<Arc<dyn WorkerController>>;

    fn messages(&self) -> broadcast::Receiver<WorkerMessage>;
}
