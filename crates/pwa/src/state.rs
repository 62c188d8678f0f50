use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PWA_STATE_KEY: &str = "pwa_state";

/// Persisted part of the app lifecycle state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PwaState {
    pub is_installed: bool,
    pub install_prompt_dismissed: bool,
    pub notification_enabled: bool,
    pub last_network_change: DateTime<Utc>,
    pub is_online: bool,
}

impl Default for PwaState {
    fn default() -> Self {
        Self {
            is_installed: false,
            install_prompt_dismissed: false,
            notification_enabled: false,
            last_network_change: Utc::now(),
            is_online: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PwaEvent {
    InstallPromptAvailable,
    Installed,
    InstallDismissed,
    NotificationsChanged { enabled: bool },
    NetworkChanged { online: bool },
    UpdateAvailable,
}
