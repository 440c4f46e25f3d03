use std::sync::atomic::AtomicU64;

use serde::Serialize;

use super::{bump, read};

#[derive(Debug, Default)]
pub struct HubMetrics {
    connections_accepted: AtomicU64,
    auth_failures: AtomicU64,
    records_persisted: AtomicU64,
    duplicates_ignored: AtomicU64,
    records_rejected: AtomicU64,
    broadcasts_sent: AtomicU64,
    broadcast_failures: AtomicU64,
    idle_disconnects: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubMetricsSnapshot {
    pub connections_accepted: u64,
    pub auth_failures: u64,
    pub records_persisted: u64,
    pub duplicates_ignored: u64,
    pub records_rejected: u64,
    pub broadcasts_sent: u64,
    pub broadcast_failures: u64,
    pub idle_disconnects: u64,
}

impl HubMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_accepted(&self) {
        bump(&self.connections_accepted, 1);
    }

    pub fn auth_failed(&self) {
        bump(&self.auth_failures, 1);
    }

    pub fn push_persisted(&self, persisted: usize, duplicates: usize, rejected: usize) {
        bump(&self.records_persisted, persisted as u64);
        bump(&self.duplicates_ignored, duplicates as u64);
        bump(&self.records_rejected, rejected as u64);
    }

    pub fn broadcast_sent(&self) {
        bump(&self.broadcasts_sent, 1);
    }

    pub fn broadcast_failed(&self) {
        bump(&self.broadcast_failures, 1);
    }

    pub fn idle_disconnect(&self) {
        bump(&self.idle_disconnects, 1);
    }

    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            connections_accepted: read(&self.connections_accepted),
            auth_failures: read(&self.auth_failures),
            records_persisted: read(&self.records_persisted),
            duplicates_ignored: read(&self.duplicates_ignored),
            records_rejected: read(&self.records_rejected),
            broadcasts_sent: read(&self.broadcasts_sent),
            broadcast_failures: read(&self.broadcast_failures),
            idle_disconnects: read(&self.idle_disconnects),
        }
    }
}
