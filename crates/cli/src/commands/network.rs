use super::print_json;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::*;
use infrastructure::config::DeskConfig;
use network::{
    describe_connection_type, describe_effective_type, ConnectionInfo, ConnectionType,
    EffectiveType, HttpProbe, ManualSource, NetworkMonitor, NetworkStatus, ProbeQuality,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Args)]
pub struct NetworkCommand {
    #[command(subcommand)]
    command: NetworkSubcommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum NetworkSubcommand {
    /// Score a connection described by flags
    Status {
        #[arg(long)]
        offline: bool,
        /// wifi, ethernet, cellular, bluetooth, wimax, other, none, unknown;
        /// anything else is reported as given
        #[arg(long = "type", default_value = "unknown")]
        connection_type: String,
        /// slow-2g, 2g, 3g or 4g
        #[arg(long, default_value = "4g")]
        effective: String,
        /// Downlink in Mbps, 0 when unknown
        #[arg(long, default_value_t = 0.0)]
        downlink: f64,
        /// Round trip time in ms, 0 when unknown
        #[arg(long, default_value_t = 0.0)]
        rtt: f64,
        #[arg(long)]
        save_data: bool,
        #[arg(long)]
        json: bool,
    },
    /// Measure latency with a HEAD request
    Probe {
        /// Defaults to network.probe_url from the config
        url: Option<String>,
        #[arg(long)]
        timeout_ms: Option<u64>,
        #[arg(long)]
        json: bool,
    },
}

impl NetworkCommand {
    pub async fn execute(self, config: &DeskConfig) -> Result<()> {
        match self.command {
            NetworkSubcommand::Status {
                offline,
                connection_type,
                effective,
                downlink,
                rtt,
                save_data,
                json,
            } => {
                let info = ConnectionInfo {
                    connection_type: ConnectionType::from(connection_type.as_str()),
                    effective_type: EffectiveType::from(effective.as_str()),
                    downlink_mbps: downlink,
                    rtt_ms: rtt,
                    save_data,
                };
                status(config, !offline, info, json)
            }
            NetworkSubcommand::Probe {
                url,
                timeout_ms,
                json,
            } => probe(config, url, timeout_ms, json).await,
        }
    }
}

fn monitor(config: &DeskConfig, online: bool, info: Option<ConnectionInfo>) -> NetworkMonitor {
    let source = Arc::new(ManualSource::new(online, info));
    NetworkMonitor::new(source, config.network.check_interval())
}

fn status(config: &DeskConfig, online: bool, info: ConnectionInfo, json: bool) -> Result<()> {
    let monitor = monitor(config, online, Some(info));
    monitor.detect_connection_info();
    let snapshot = monitor.snapshot();

    if json {
        return print_json(&snapshot);
    }

    let status = match snapshot.status {
        NetworkStatus::Online => "online".green(),
        NetworkStatus::Slow => "slow".yellow(),
        NetworkStatus::Offline => "offline".red(),
    };
    println!("{} Network: {}", "ℹ".blue(), status.bold());
    println!("  description: {}", snapshot.description);
    println!("  quality: {}/100", snapshot.quality);
    println!("  slow: {}", snapshot.is_slow);
    println!(
        "  type: {}",
        describe_connection_type(&snapshot.info.connection_type)
    );
    println!(
        "  effective: {}",
        describe_effective_type(&snapshot.info.effective_type)
    );
    Ok(())
}

async fn probe(
    config: &DeskConfig,
    url: Option<String>,
    timeout_ms: Option<u64>,
    json: bool,
) -> Result<()> {
    let url = url
        .or_else(|| config.network.probe_url.clone())
        .context("no probe url, pass one or set network.probe_url")?;
    let timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.network.probe_timeout());

    let probe = HttpProbe::new(&url, timeout).with_context(|| format!("Invalid probe url {}", url))?;
    let monitor = monitor(config, true, None);
    let result = monitor.test_connection_quality(&probe).await;

    if json {
        return print_json(&result);
    }

    let quality = match result.quality {
        ProbeQuality::Excellent | ProbeQuality::Good => result.quality.to_string().green(),
        ProbeQuality::Slow => result.quality.to_string().yellow(),
        ProbeQuality::Poor | ProbeQuality::Offline => result.quality.to_string().red(),
    };
    println!("{} Probe {}", "ℹ".blue(), probe.url());
    match result.latency_ms {
        Some(latency) => println!("  latency: {} ms", latency),
        None => println!("  latency: unavailable"),
    }
    println!("  quality: {}", quality);
    Ok(())
}
