use crate::error::{PwaResult, WorkerError};
use crate::state::{PwaEvent, PwaState, PWA_STATE_KEY};
use crate::worker::WorkerContainer;
use async_trait::async_trait;
use chrono::Utc;
use common::topics::TOPIC_PWA;
use common::{EventBus, EventEnvelope, HasSeverity};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storage::{StorageArea, StoreOptions, VersionedStore};
use tokio::sync::broadcast;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallOutcome {
    Accepted,
    Dismissed,
}

/// Install prompt the host handed over and asked us to show later.
#[async_trait]
pub trait DeferredPrompt: Send + Sync {
    async fn prompt(&self) -> PwaResult<()>;

    async fn user_choice(&self) -> PwaResult<InstallOutcome>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    Default,
}

#[async_trait]
pub trait NotificationPermissions: Send + Sync {
    fn is_supported(&self) -> bool;

    fn current(&self) -> Permission;

    async fn request(&self) -> PwaResult<Permission>;
}

/// Install/notification/network bookkeeping persisted under `pwa_state`.
pub struct InstallManager {
    store: VersionedStore<PwaState>,
    deferred: Mutex<Option<Arc<dyn DeferredPrompt>>>,
    installable: AtomicBool,
    update_available: AtomicBool,
    events: EventBus<PwaEvent>,
}

impl InstallManager {
    /// Restores saved state; `current_online` wins over the saved flag.
    pub fn new(area: Arc<StorageArea>, current_online: bool) -> Self {
        Self::with_events(area, current_online, EventBus::default())
    }

    pub fn with_events(
        area: Arc<StorageArea>,
        current_online: bool,
        events: EventBus<PwaEvent>,
    ) -> Self {
        let options = StoreOptions::default();
        let manager = Self {
            store: VersionedStore::new(area, PWA_STATE_KEY, PwaState::default(), options),
            deferred: Mutex::new(None),
            installable: AtomicBool::new(false),
            update_available: AtomicBool::new(false),
            events,
        };
        manager.restore_state(current_online);
        manager
    }

    pub fn state(&self) -> PwaState {
        self.store.value()
    }

    pub fn is_installable(&self) -> bool {
        self.installable.load(Ordering::SeqCst)
    }

    pub fn update_available(&self) -> bool {
        self.update_available.load(Ordering::SeqCst)
    }

    pub fn has_deferred_prompt(&self) -> bool {
        self.deferred.lock().is_some()
    }

    /// Reload saved state. The network flag always comes from
    /// `current_online`, never from disk.
    pub fn restore_state(&self, current_online: bool) {
        let mut state = self.store.load();
        state.is_online = current_online;
        debug!(
            installed = state.is_installed,
            dismissed = state.install_prompt_dismissed,
            "restored pwa state"
        );
        self.replace_in_memory(state);
    }

    /// Keep the host's prompt for later. Installable only when the app is
    /// neither installed nor was the prompt dismissed before.
    pub async fn on_before_install_prompt(&self, prompt: Arc<dyn DeferredPrompt>) {
        *self.deferred.lock() = Some(prompt);
        let state = self.state();
        if !state.is_installed && !state.install_prompt_dismissed {
            self.installable.store(true, Ordering::SeqCst);
            self.emit(PwaEvent::InstallPromptAvailable).await;
        }
    }

    /// Shows the deferred prompt. `false` if there is nothing to show or the
    /// prompt failed; `true` once the user has answered either way.
    pub async fn show_install_prompt(&self) -> bool {
        let prompt = match self.deferred.lock().clone() {
            Some(prompt) if self.is_installable() => prompt,
            _ => return false,
        };

        let outcome = match prompt.prompt().await {
            Ok(()) => prompt.user_choice().await,
            Err(e) => Err(e),
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                e.log();
                return false;
            }
        };

        self.installable.store(false, Ordering::SeqCst);
        *self.deferred.lock() = None;
        let mut state = self.state();
        let event = match outcome {
            InstallOutcome::Accepted => {
                state.is_installed = true;
                PwaEvent::Installed
            }
            InstallOutcome::Dismissed => {
                state.install_prompt_dismissed = true;
                PwaEvent::InstallDismissed
            }
        };
        info!(?outcome, "install prompt answered");
        self.save(state);
        self.emit(event).await;
        true
    }

    pub async fn dismiss_install_prompt(&self) {
        self.installable.store(false, Ordering::SeqCst);
        *self.deferred.lock() = None;
        let mut state = self.state();
        state.install_prompt_dismissed = true;
        self.save(state);
        self.emit(PwaEvent::InstallDismissed).await;
    }

    /// Host reports the app got installed by other means.
    pub async fn on_app_installed(&self) {
        self.installable.store(false, Ordering::SeqCst);
        *self.deferred.lock() = None;
        let mut state = self.state();
        state.is_installed = true;
        self.save(state);
        self.emit(PwaEvent::Installed).await;
    }

    pub async fn enable_notifications(&self, permissions: &dyn NotificationPermissions) -> bool {
        // Неподдерживаемая платформа и сбой запроса не сохраняются
        let (enabled, persist) = if !permissions.is_supported() {
            (false, false)
        } else if permissions.current() == Permission::Granted {
            (true, true)
        } else {
            match permissions.request().await {
                Ok(permission) => (permission == Permission::Granted, true),
                Err(e) => {
                    e.log();
                    (false, false)
                }
            }
        };

        let mut state = self.state();
        state.notification_enabled = enabled;
        if persist {
            self.save(state);
        } else {
            self.replace_in_memory(state);
        }
        self.emit(PwaEvent::NotificationsChanged { enabled }).await;
        enabled
    }

    pub async fn update_network_status(&self, online: bool) {
        let mut state = self.state();
        state.is_online = online;
        state.last_network_change = Utc::now();
        self.save(state);
        self.emit(PwaEvent::NetworkChanged { online }).await;
    }

    /// Asks the current registration to update. A waiting or installing
    /// worker afterwards means an update is available.
    pub async fn check_for_updates(&self, container: &dyn WorkerContainer) -> bool {
        if !container.is_supported() {
            return false;
        }

        let result = async {
            let Some(registration) = container.get_registration().await? else {
                return Ok(false);
            };
            registration.update().await?;
            Ok::<_, WorkerError>(
                registration.waiting().is_some() || registration.installing().is_some(),
            )
        }
        .await;

        let available = result.unwrap_or_else(|e| {
            e.log();
            false
        });
        self.update_available.store(available, Ordering::SeqCst);
        if available {
            self.emit(PwaEvent::UpdateAvailable).await;
        }
        available
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<EventEnvelope<PwaEvent>> {
        self.events.subscribe(TOPIC_PWA).await
    }

    /// Drop the deferred prompt; saved state is untouched.
    pub fn cleanup(&self) {
        *self.deferred.lock() = None;
        self.installable.store(false, Ordering::SeqCst);
    }

    /// A failed write is logged by the store; the in-memory state still
    /// moves on.
    fn save(&self, state: PwaState) {
        if self.store.save(state.clone()).is_err() {
            self.replace_in_memory(state);
        }
    }

    fn replace_in_memory(&self, state: PwaState) {
        self.store.set_in_memory(state);
    }

    async fn emit(&self, event: PwaEvent) {
        self.events.publish(TOPIC_PWA, event).await;
    }
}
