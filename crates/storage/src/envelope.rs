use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// On-disk shape of a stored record.
///
/// ```json
/// {"_version": "1.0", "data": {...}, "timestamp": 1700000000000, "expireAt": 1700000060000}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "_version")]
    pub version: String,
    pub data: T,
    /// Write time, ms since the unix epoch
    pub timestamp: i64,
    #[serde(rename = "expireAt", default, skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<i64>,
}

impl<T> Envelope<T> {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expire_at.is_some_and(|at| at <= now_ms)
    }
}

/// Outcome of decoding a raw record.
#[derive(Debug, PartialEq)]
pub(crate) enum Decoded<T> {
    Fresh(T),
    Expired,
    Incompatible,
    Corrupt(String),
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// A record is compatible when it is an object carrying a non-empty string
/// `_version` whose major component equals `version`'s.
pub fn is_version_compatible(record: &Value, version: &str) -> bool {
    match record.get("_version").and_then(Value::as_str) {
        Some(stored) if !stored.is_empty() => major(stored) == major(version),
        _ => false,
    }
}

pub(crate) fn decode<T: DeserializeOwned>(raw: &str, version: &str, now_ms: i64) -> Decoded<T> {
    let record: Value = match serde_json::from_str(raw) {
        Ok(record) => record,
        Err(e) => return Decoded::Corrupt(e.to_string()),
    };

    if !is_version_compatible(&record, version) {
        return Decoded::Incompatible;
    }

    let envelope: Envelope<Value> = match serde_json::from_value(record) {
        Ok(envelope) => envelope,
        Err(e) => return Decoded::Corrupt(e.to_string()),
    };

    if envelope.is_expired(now_ms) {
        return Decoded::Expired;
    }

    match serde_json::from_value(envelope.data) {
        Ok(data) => Decoded::Fresh(data),
        // Данные текущей версии, но не той формы: для вызывающего это несовместимая запись
        Err(_) => Decoded::Incompatible,
    }
}
