use crate::types::ConnectionInfo;
use parking_lot::RwLock;
use tokio::sync::broadcast;

/// Platform notification about the link
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Online,
    Offline,
    ConnectionChanged,
}

/// Where a [`crate::NetworkMonitor`] learns about connectivity.
pub trait ConnectionSource: Send + Sync {
    fn is_online(&self) -> bool;

    /// `None` when the platform exposes no connection details.
    fn connection_info(&self) -> Option<ConnectionInfo>;

    fn events(&self) -> broadcast::Receiver<SourceEvent>;
}

/// Source driven by explicit calls. Used by the CLI (fed from a probe) and
/// by tests.
pub struct ManualSource {
    online: RwLock<bool>,
    info: RwLock<Option<ConnectionInfo>>,
    events: broadcast::Sender<SourceEvent>,
}

impl ManualSource {
    pub fn new(online: bool, info: Option<ConnectionInfo>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            online: RwLock::new(online),
            info: RwLock::new(info),
            events,
        }
    }

    pub fn set_online(&self, online: bool) {
        *self.online.write() = online;
        let event = if online {
            SourceEvent::Online
        } else {
            SourceEvent::Offline
        };
        let _ = self.events.send(event);
    }

    pub fn set_info(&self, info: Option<ConnectionInfo>) {
        *self.info.write() = info;
        let _ = self.events.send(SourceEvent::ConnectionChanged);
    }
}

impl Default for ManualSource {
    fn default() -> Self {
        Self::new(true, None)
    }
}

impl ConnectionSource for ManualSource {
    fn is_online(&self) -> bool {
        *self.online.read()
    }

    fn connection_info(&self) -> Option<ConnectionInfo> {
        self.info.read().clone()
    }

    fn events(&self) -> broadcast::Receiver<SourceEvent> {
        self.events.subscribe()
    }
}
