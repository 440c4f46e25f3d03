//! # synapse-observability
//!
//! Tracing setup and named events, lock-free counters for the hub and the
//! sync engine, and a tracker for degraded sync periods.

pub mod degradation;
pub mod metrics;
pub mod tracing_setup;

pub use degradation::{DegradationTracker, RecoveryStatus, TrackedDegradation};
pub use metrics::{HubMetrics, HubMetricsSnapshot, SyncMetrics, SyncMetricsSnapshot};
pub use tracing_setup::{init_tracing, init_tracing_with_filter};
