use std::sync::atomic::AtomicU64;

use serde::Serialize;

use super::{bump, read};

#[derive(Debug, Default)]
pub struct SyncMetrics {
    sync_attempts: AtomicU64,
    sync_successes: AtomicU64,
    sync_failures: AtomicU64,
    retries: AtomicU64,
    records_pulled: AtomicU64,
    records_applied: AtomicU64,
    conflicts_resolved: AtomicU64,
    duplicates_skipped: AtomicU64,
    records_pushed: AtomicU64,
    records_rejected: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetricsSnapshot {
    pub sync_attempts: u64,
    pub sync_successes: u64,
    pub sync_failures: u64,
    pub retries: u64,
    pub records_pulled: u64,
    pub records_applied: u64,
    pub conflicts_resolved: u64,
    pub duplicates_skipped: u64,
    pub records_pushed: u64,
    pub records_rejected: u64,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempt(&self) {
        bump(&self.sync_attempts, 1);
    }

    pub fn success(&self) {
        bump(&self.sync_successes, 1);
    }

    pub fn failure(&self) {
        bump(&self.sync_failures, 1);
    }

    pub fn retry(&self) {
        bump(&self.retries, 1);
    }

    pub fn pulled(&self, n: usize) {
        bump(&self.records_pulled, n as u64);
    }

    pub fn applied(&self, applied: usize, conflicts: usize, duplicates: usize) {
        bump(&self.records_applied, applied as u64);
        bump(&self.conflicts_resolved, conflicts as u64);
        bump(&self.duplicates_skipped, duplicates as u64);
    }

    pub fn pushed(&self, accepted: usize, rejected: usize) {
        bump(&self.records_pushed, accepted as u64);
        bump(&self.records_rejected, rejected as u64);
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        SyncMetricsSnapshot {
            sync_attempts: read(&self.sync_attempts),
            sync_successes: read(&self.sync_successes),
            sync_failures: read(&self.sync_failures),
            retries: read(&self.retries),
            records_pulled: read(&self.records_pulled),
            records_applied: read(&self.records_applied),
            conflicts_resolved: read(&self.conflicts_resolved),
            duplicates_skipped: read(&self.duplicates_skipped),
            records_pushed: read(&self.records_pushed),
            records_rejected: read(&self.records_rejected),
        }
    }
}
