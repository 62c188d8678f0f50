use crate::types::{ConnectionInfo, ConnectionType, EffectiveType, NetworkStatus, ProbeQuality};

pub fn network_status(online: bool, info: &ConnectionInfo) -> NetworkStatus {
    if !online {
        NetworkStatus::Offline
    } else if info.effective_type.is_slow() {
        NetworkStatus::Slow
    } else {
        NetworkStatus::Online
    }
}

/// Score in `0..=100`. Starts from the effective type and is nudged by
/// reported rtt and downlink; unreported (zero) values are ignored.
pub fn connection_quality(online: bool, info: &ConnectionInfo) -> u8 {
    if !online {
        return 0;
    }

    let mut score: f64 = match info.effective_type {
        EffectiveType::FourG => 100.0,
        EffectiveType::ThreeG => 75.0,
        EffectiveType::TwoG => 50.0,
        EffectiveType::Slow2g => 25.0,
        EffectiveType::Unknown(_) => 80.0,
    };

    if info.rtt_ms > 0.0 {
        if info.rtt_ms < 100.0 {
            score = (score + 10.0).min(100.0);
        } else if info.rtt_ms > 1000.0 {
            score = (score - 30.0).max(0.0);
        }
    }

    if info.downlink_mbps > 0.0 {
        if info.downlink_mbps >= 10.0 {
            score = (score + 5.0).min(100.0);
        } else if info.downlink_mbps < 1.0 {
            score = (score - 20.0).max(0.0);
        }
    }

    score.round() as u8
}

/// Note: an unreported downlink (zero) counts as slow.
pub fn is_slow_connection(info: &ConnectionInfo) -> bool {
    info.save_data
        || info.effective_type.is_slow()
        || info.rtt_ms > 1000.0
        || info.downlink_mbps < 1.0
}

/// Short human readable summary, e.g. `wifi 4G 10 Mbps`.
pub fn connection_description(online: bool, info: &ConnectionInfo) -> String {
    if !online {
        return "offline".to_string();
    }

    let mut parts = Vec::with_capacity(3);
    if info.connection_type != ConnectionType::Unknown {
        parts.push(info.connection_type.as_str().to_string());
    }
    let effective = info.effective_type.as_str();
    if !effective.is_empty() && effective != "unknown" {
        parts.push(effective.to_uppercase());
    }
    if info.downlink_mbps > 0.0 {
        parts.push(format!("{} Mbps", info.downlink_mbps));
    }

    if parts.is_empty() {
        "online".to_string()
    } else {
        parts.join(" ")
    }
}

/// Unrecognized types are echoed back as-is.
pub fn describe_connection_type(kind: &ConnectionType) -> &str {
    match kind {
        ConnectionType::Bluetooth => "Bluetooth",
        ConnectionType::Cellular => "Cellular",
        ConnectionType::Ethernet => "Ethernet",
        ConnectionType::Wifi => "WiFi",
        ConnectionType::Wimax => "WiMAX",
        ConnectionType::Other => "Other",
        ConnectionType::Unknown => "Unknown",
        ConnectionType::None => "No connection",
        ConnectionType::Unrecognized(raw) => raw,
    }
}

/// Unrecognized types are echoed back as-is.
pub fn describe_effective_type(effective: &EffectiveType) -> String {
    match effective {
        EffectiveType::Slow2g => "Very slow (< 50 Kbps)".to_string(),
        EffectiveType::TwoG => "Slow (< 250 Kbps)".to_string(),
        EffectiveType::ThreeG => "Medium (< 1.5 Mbps)".to_string(),
        EffectiveType::FourG => "Fast (>= 1.5 Mbps)".to_string(),
        EffectiveType::Unknown(raw) => raw.clone(),
    }
}

pub fn classify_latency(latency_ms: f64) -> ProbeQuality {
    if latency_ms < 100.0 {
        ProbeQuality::Excellent
    } else if latency_ms < 300.0 {
        ProbeQuality::Good
    } else if latency_ms < 1000.0 {
        ProbeQuality::Slow
    } else {
        ProbeQuality::Poor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(effective: &str, rtt_ms: f64, downlink_mbps: f64) -> ConnectionInfo {
        ConnectionInfo {
            effective_type: EffectiveType::from(effective),
            rtt_ms,
            downlink_mbps,
            ..Default::default()
        }
    }

    #[test]
    fn status_by_effective_type() {
        assert_eq!(network_status(false, &info("4g", 0.0, 0.0)), NetworkStatus::Offline);
        assert_eq!(network_status(true, &info("2g", 0.0, 0.0)), NetworkStatus::Slow);
        assert_eq!(network_status(true, &info("slow-2g", 0.0, 0.0)), NetworkStatus::Slow);
        assert_eq!(network_status(true, &info("3g", 0.0, 0.0)), NetworkStatus::Online);
    }

    #[test]
    fn quality_scores() {
        assert_eq!(connection_quality(false, &info("4g", 50.0, 20.0)), 0);
        assert_eq!(connection_quality(true, &info("4g", 0.0, 0.0)), 100);
        assert_eq!(connection_quality(true, &info("4g", 50.0, 20.0)), 100);
        assert_eq!(connection_quality(true, &info("3g", 50.0, 0.0)), 85);
        assert_eq!(connection_quality(true, &info("3g", 500.0, 12.0)), 80);
        assert_eq!(connection_quality(true, &info("2g", 1500.0, 0.5)), 0);
        assert_eq!(connection_quality(true, &info("slow-2g", 1500.0, 0.0)), 0);
        assert_eq!(connection_quality(true, &info("5g", 0.0, 0.0)), 80);
        assert_eq!(connection_quality(true, &info("3g", 0.0, 0.5)), 55);
    }

    #[test]
    fn slow_connection_rules() {
        assert!(!is_slow_connection(&info("4g", 50.0, 10.0)));
        assert!(is_slow_connection(&info("4g", 50.0, 0.0)));
        assert!(is_slow_connection(&info("4g", 1200.0, 10.0)));
        assert!(is_slow_connection(&info("2g", 50.0, 10.0)));
        let mut saver = info("4g", 50.0, 10.0);
        saver.save_data = true;
        assert!(is_slow_connection(&saver));
    }

    #[test]
    fn descriptions() {
        let mut wifi = info("4g", 40.0, 10.0);
        wifi.connection_type = ConnectionType::Wifi;
        assert_eq!(connection_description(true, &wifi), "wifi 4G 10 Mbps");
        assert_eq!(connection_description(false, &wifi), "offline");

        assert_eq!(connection_description(true, &info("3g", 0.0, 1.5)), "3G 1.5 Mbps");
        assert_eq!(connection_description(true, &info("unknown", 0.0, 0.0)), "online");

        let mut satellite = info("3g", 0.0, 2.0);
        satellite.connection_type = ConnectionType::from("satellite");
        assert_eq!(connection_description(true, &satellite), "satellite 3G 2 Mbps");
        assert_eq!(describe_connection_type(&satellite.connection_type), "satellite");

        assert_eq!(describe_connection_type(&ConnectionType::None), "No connection");
        assert_eq!(describe_effective_type(&EffectiveType::ThreeG), "Medium (< 1.5 Mbps)");
        assert_eq!(describe_effective_type(&EffectiveType::from("5g")), "5g");
    }

    #[test]
    fn latency_classes() {
        assert_eq!(classify_latency(99.9), ProbeQuality::Excellent);
        assert_eq!(classify_latency(100.0), ProbeQuality::Good);
        assert_eq!(classify_latency(299.0), ProbeQuality::Good);
        assert_eq!(classify_latency(300.0), ProbeQuality::Slow);
        assert_eq!(classify_latency(1000.0), ProbeQuality::Poor);
    }
}
