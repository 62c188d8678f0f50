use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Effective connection class as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EffectiveType {
    Slow2g,
    TwoG,
    ThreeG,
    FourG,
    Unknown(String),
}

impl EffectiveType {
    pub fn as_str(&self) -> &str {
        match self {
            EffectiveType::Slow2g => "slow-2g",
            EffectiveType::TwoG => "2g",
            EffectiveType::ThreeG => "3g",
            EffectiveType::FourG => "4g",
            EffectiveType::Unknown(raw) => raw,
        }
    }

    /// 2g and slower
    pub fn is_slow(&self) -> bool {
        matches!(self, EffectiveType::Slow2g | EffectiveType::TwoG)
    }
}

impl Default for EffectiveType {
    fn default() -> Self {
        EffectiveType::FourG
    }
}

impl From<&str> for EffectiveType {
    fn from(raw: &str) -> Self {
        match raw {
            "slow-2g" => EffectiveType::Slow2g,
            "2g" => EffectiveType::TwoG,
            "3g" => EffectiveType::ThreeG,
            "4g" => EffectiveType::FourG,
            other => EffectiveType::Unknown(other.to_string()),
        }
    }
}

impl From<String> for EffectiveType {
    fn from(raw: String) -> Self {
        EffectiveType::from(raw.as_str())
    }
}

impl From<EffectiveType> for String {
    fn from(value: EffectiveType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EffectiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical link kind. Types the platform reports that we don't know are
/// kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConnectionType {
    Bluetooth,
    Cellular,
    Ethernet,
    Wifi,
    Wimax,
    Other,
    #[default]
    Unknown,
    None,
    Unrecognized(String),
}

impl ConnectionType {
    pub fn as_str(&self) -> &str {
        match self {
            ConnectionType::Bluetooth => "bluetooth",
            ConnectionType::Cellular => "cellular",
            ConnectionType::Ethernet => "ethernet",
            ConnectionType::Wifi => "wifi",
            ConnectionType::Wimax => "wimax",
            ConnectionType::Other => "other",
            ConnectionType::Unknown => "unknown",
            ConnectionType::None => "none",
            ConnectionType::Unrecognized(raw) => raw,
        }
    }
}

impl From<&str> for ConnectionType {
    fn from(raw: &str) -> Self {
        match raw {
            "bluetooth" => ConnectionType::Bluetooth,
            "cellular" => ConnectionType::Cellular,
            "ethernet" => ConnectionType::Ethernet,
            "wifi" => ConnectionType::Wifi,
            "wimax" => ConnectionType::Wimax,
            "other" => ConnectionType::Other,
            "none" => ConnectionType::None,
            "" | "unknown" => ConnectionType::Unknown,
            other => ConnectionType::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for ConnectionType {
    fn from(raw: String) -> Self {
        ConnectionType::from(raw.as_str())
    }
}

impl From<ConnectionType> for String {
    fn from(value: ConnectionType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection details. Zero `downlink_mbps`/`rtt_ms` mean "not reported".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub connection_type: ConnectionType,
    pub effective_type: EffectiveType,
    pub downlink_mbps: f64,
    pub rtt_ms: f64,
    pub save_data: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    Online,
    Offline,
    Slow,
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkStatus::Online => write!(f, "online"),
            NetworkStatus::Offline => write!(f, "offline"),
            NetworkStatus::Slow => write!(f, "slow"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeQuality {
    Excellent,
    Good,
    Slow,
    Poor,
    Offline,
}

impl fmt::Display for ProbeQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProbeQuality::Excellent => "excellent",
            ProbeQuality::Good => "good",
            ProbeQuality::Slow => "slow",
            ProbeQuality::Poor => "poor",
            ProbeQuality::Offline => "offline",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub latency_ms: Option<u64>,
    pub speed_mbps: Option<f64>,
    pub quality: ProbeQuality,
}

impl ProbeResult {
    pub fn offline() -> Self {
        Self {
            latency_ms: None,
            speed_mbps: None,
            quality: ProbeQuality::Offline,
        }
    }

    pub fn failed() -> Self {
        Self {
            latency_ms: None,
            speed_mbps: None,
            quality: ProbeQuality::Poor,
        }
    }
}

/// Everything known about the network at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub online: bool,
    pub info: ConnectionInfo,
    pub status: NetworkStatus,
    pub quality: u8,
    pub is_slow: bool,
    pub description: String,
    pub last_check: DateTime<Utc>,
    pub change_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_type_round_trips_unknown_values() {
        assert_eq!(EffectiveType::from("slow-2g"), EffectiveType::Slow2g);
        let odd = EffectiveType::from("5g");
        assert_eq!(odd.as_str(), "5g");
        assert_eq!(serde_json::to_string(&odd).unwrap(), "\"5g\"");
        let back: EffectiveType = serde_json::from_str("\"3g\"").unwrap();
        assert_eq!(back, EffectiveType::ThreeG);
    }

    #[test]
    fn connection_type_keeps_unrecognized_values() {
        assert_eq!(ConnectionType::from(""), ConnectionType::Unknown);
        assert_eq!(ConnectionType::from("wifi").to_string(), "wifi");

        let satellite = ConnectionType::from("satellite");
        assert_eq!(satellite, ConnectionType::Unrecognized("satellite".into()));
        assert_eq!(serde_json::to_string(&satellite).unwrap(), "\"satellite\"");
        let back: ConnectionType = serde_json::from_str("\"ethernet\"").unwrap();
        assert_eq!(back, ConnectionType::Ethernet);

        assert_eq!(ConnectionInfo::default().connection_type, ConnectionType::Unknown);
        assert_eq!(ConnectionInfo::default().effective_type, EffectiveType::FourG);
    }
}
