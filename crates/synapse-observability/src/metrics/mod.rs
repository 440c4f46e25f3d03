//! Counters shared through `Arc`. Every counter is a relaxed atomic; a
//! snapshot is a plain serializable copy.

pub mod hub_metrics;
pub mod sync_metrics;

pub use hub_metrics::{HubMetrics, HubMetricsSnapshot};
pub use sync_metrics::{SyncMetrics, SyncMetricsSnapshot};

use std::sync::atomic::{AtomicU64, Ordering};

pub(crate) fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

pub(crate) fn read(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
}
