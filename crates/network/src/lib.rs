//! Connectivity heuristics and monitoring.
//!
//! The scoring functions in [`heuristics`] are pure; [`NetworkMonitor`]
//! keeps the current state fed by a [`ConnectionSource`] and re-detects the
//! connection on a fixed interval. Latency probing goes through the
//! [`LatencyProbe`] trait, [`HttpProbe`] being the reqwest implementation.

pub mod error;
pub mod heuristics;
pub mod monitor;
pub mod probe;
pub mod source;
pub mod types;

pub use error::{NetworkError, NetworkResult};
pub use heuristics::{
    classify_latency, connection_description, connection_quality, describe_connection_type,
    describe_effective_type, is_slow_connection, network_status,
};
pub use monitor::{NetworkMonitor, DEFAULT_CHECK_INTERVAL};
pub use probe::{HttpProbe, LatencyProbe};
pub use source::{ConnectionSource, ManualSource, SourceEvent};
pub use types::*;
