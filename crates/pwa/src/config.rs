use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheHandler {
    NetworkFirst,
    CacheFirst,
    #[default]
    StaleWhileRevalidate,
}

impl fmt::Display for CacheHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheHandler::NetworkFirst => write!(f, "networkFirst"),
            CacheHandler::CacheFirst => write!(f, "cacheFirst"),
            CacheHandler::StaleWhileRevalidate => write!(f, "staleWhileRevalidate"),
        }
    }
}

impl FromStr for CacheHandler {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "networkFirst" | "NetworkFirst" => Ok(CacheHandler::NetworkFirst),
            "cacheFirst" | "CacheFirst" => Ok(CacheHandler::CacheFirst),
            "staleWhileRevalidate" | "StaleWhileRevalidate" => {
                Ok(CacheHandler::StaleWhileRevalidate)
            }
            _ => Err(format!("Unknown cache strategy: {}", s)),
        }
    }
}

/// Настройки offline-режима
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PwaConfig {
    pub enable_notifications: bool,
    pub enable_background_sync: bool,
    pub cache_strategy: CacheHandler,
    pub offline_message: String,
    pub network_check_interval_ms: u64,
    pub auto_install_prompt: bool,
    pub install_prompt_delay_ms: u64,
    pub cache_version: String,
}

impl Default for PwaConfig {
    fn default() -> Self {
        Self {
            enable_notifications: false,
            enable_background_sync: false,
            cache_strategy: CacheHandler::default(),
            offline_message: "You are offline; some features may be limited".to_string(),
            network_check_interval_ms: 30_000,
            auto_install_prompt: true,
            install_prompt_delay_ms: 3_000,
            cache_version: "v1.0.0".to_string(),
        }
    }
}
