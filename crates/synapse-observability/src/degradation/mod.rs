//! Degraded-sync bookkeeping.

pub mod tracker;

pub use tracker::{DegradationTracker, RecoveryStatus, TrackedDegradation};
