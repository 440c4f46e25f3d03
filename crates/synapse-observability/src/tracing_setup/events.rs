//! Named structured events. Field names are stable; log pipelines key on `event`.

use tracing::{info, warn};

pub fn agent_authenticated(tenant_id: &str, agent_id: &str, connection_id: u64) {
    info!(event = "agent_authenticated", tenant_id, agent_id, connection_id, "agent authenticated");
}

pub fn auth_rejected(agent_id: Option<&str>, reason: &str) {
    warn!(event = "auth_rejected", agent_id = agent_id.unwrap_or("<unknown>"), reason, "authentication rejected");
}

pub fn records_pushed(tenant_id: &str, agent_id: &str, accepted: usize, duplicates: usize, rejected: usize) {
    info!(
        event = "records_pushed",
        tenant_id,
        agent_id,
        accepted,
        duplicates,
        rejected,
        "push persisted"
    );
}

pub fn broadcast_failed(tenant_id: &str, connection_id: u64, reason: &str) {
    warn!(event = "broadcast_failed", tenant_id, connection_id, reason, "broadcast delivery failed");
}

pub fn sync_completed(node_id: &str, pulled: usize, applied: usize, pushed: usize, conflicts: usize) {
    info!(event = "sync_completed", node_id, pulled, applied, pushed, conflicts, "sync completed");
}

pub fn sync_degraded(node_id: &str, attempt: u32, error: &str) {
    warn!(event = "sync_degraded", node_id, attempt, error, "sync degraded, retrying");
}

pub fn certificate_tampered(certificate_id: &str, recorded: &str, computed: &str) {
    warn!(event = "certificate_tampered", certificate_id, recorded, computed, "merkle root mismatch");
}

pub fn edges_pruned(removed: usize, min_confidence: f64, min_sample_size: u64) {
    info!(event = "edges_pruned", removed, min_confidence, min_sample_size, "pruned causal edges");
}
