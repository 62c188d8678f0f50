use crate::heuristics::*;
use crate::probe::LatencyProbe;
use crate::source::{ConnectionSource, SourceEvent};
use crate::types::{ConnectionInfo, NetworkSnapshot, ProbeResult};
use chrono::{DateTime, Utc};
use common::HasSeverity;
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

struct MonitorState {
    online: bool,
    info: ConnectionInfo,
    last_check: DateTime<Utc>,
    change_count: u64,
}

/// Текущее состояние сети с фоновым мониторингом
pub struct NetworkMonitor {
    source: Arc<dyn ConnectionSource>,
    check_interval: Duration,
    state: RwLock<MonitorState>,
    snapshots: watch::Sender<NetworkSnapshot>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl NetworkMonitor {
    pub fn new(source: Arc<dyn ConnectionSource>, check_interval: Duration) -> Self {
        let state = MonitorState {
            online: source.is_online(),
            info: ConnectionInfo::default(),
            last_check: Utc::now(),
            change_count: 0,
        };
        let (snapshots, _) = watch::channel(build_snapshot(&state));
        Self {
            source,
            check_interval,
            state: RwLock::new(state),
            snapshots,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Initial detection followed by [`Self::start_monitoring`].
    pub fn initialize(self: &Arc<Self>) {
        self.update_network_status(self.source.is_online());
        self.detect_connection_info();
        self.start_monitoring();
    }

    pub fn cleanup(&self) {
        self.stop_monitoring();
    }

    /// Pull connection details from the source. Without details the last
    /// known values are kept.
    pub fn detect_connection_info(&self) {
        {
            let mut state = self.state.write();
            if let Some(info) = self.source.connection_info() {
                state.info = info;
            }
            state.last_check = Utc::now();
        }
        self.publish();
    }

    /// Record the online flag. Only an actual change bumps the change
    /// counter and re-detects the connection.
    pub fn update_network_status(&self, online: bool) {
        let changed = {
            let mut state = self.state.write();
            let changed = state.online != online;
            state.online = online;
            if changed {
                state.change_count += 1;
            }
            changed
        };

        if changed {
            info!(online, "network status changed");
            self.detect_connection_info();
        } else {
            self.publish();
        }
    }

    /// Listen to source events and re-detect every `check_interval`.
    /// Restarts any monitoring already running.
    pub fn start_monitoring(self: &Arc<Self>) {
        self.stop_monitoring();

        let mut events = self.source.events();
        let weak = Arc::downgrade(self);
        let listener = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(monitor) = weak.upgrade() else { break };
                        monitor.handle(event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "network events lagged");
                        let Some(monitor) = weak.upgrade() else { break };
                        let online = monitor.source.is_online();
                        monitor.update_network_status(online);
                        monitor.detect_connection_info();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let poller = spawn_poller(Arc::downgrade(self), self.check_interval);

        let mut tasks = self.tasks.lock();
        tasks.push(listener);
        tasks.push(poller);
        debug!(interval_ms = self.check_interval.as_millis() as u64, "network monitoring started");
    }

    pub fn stop_monitoring(&self) {
        let mut tasks = self.tasks.lock();
        if tasks.is_empty() {
            return;
        }
        for task in tasks.drain(..) {
            task.abort();
        }
        debug!("network monitoring stopped");
    }

    pub fn is_monitoring(&self) -> bool {
        !self.tasks.lock().is_empty()
    }

    pub fn is_online(&self) -> bool {
        self.state.read().online
    }

    pub fn snapshot(&self) -> NetworkSnapshot {
        build_snapshot(&self.state.read())
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkSnapshot> {
        self.snapshots.subscribe()
    }

    /// One latency measurement. Offline short-circuits without probing and
    /// a failed probe reports poor quality.
    pub async fn test_connection_quality(&self, probe: &dyn LatencyProbe) -> ProbeResult {
        if !self.is_online() {
            return ProbeResult::offline();
        }

        match probe.measure().await {
            Ok(latency) => {
                let latency_ms = latency.as_secs_f64() * 1000.0;
                let downlink = self.state.read().info.downlink_mbps;
                ProbeResult {
                    latency_ms: Some(latency_ms.round() as u64),
                    speed_mbps: (downlink > 0.0).then_some(downlink),
                    quality: classify_latency(latency_ms),
                }
            }
            Err(e) => {
                e.log();
                ProbeResult::failed()
            }
        }
    }

    fn handle(&self, event: SourceEvent) {
        match event {
            SourceEvent::Online => self.update_network_status(true),
            SourceEvent::Offline => self.update_network_status(false),
            SourceEvent::ConnectionChanged => self.detect_connection_info(),
        }
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.snapshots.send_replace(snapshot);
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

fn spawn_poller(weak: Weak<NetworkMonitor>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // первый тик срабатывает сразу
        interval.tick().await;

        loop {
            interval.tick().await;
            let Some(monitor) = weak.upgrade() else { break };
            monitor.detect_connection_info();
        }
    })
}

fn build_snapshot(state: &MonitorState) -> NetworkSnapshot {
    NetworkSnapshot {
        online: state.online,
        info: state.info.clone(),
        status: network_status(state.online, &state.info),
        quality: connection_quality(state.online, &state.info),
        is_slow: is_slow_connection(&state.info),
        description: connection_description(state.online, &state.info),
        last_check: state.last_check,
        change_count: state.change_count,
    }
}
