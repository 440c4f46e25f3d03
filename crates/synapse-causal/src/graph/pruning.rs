//! Maintenance pruning: delete weak edges nobody has touched within the
//! retention window.

use rusqlite::Connection;
use serde::Serialize;
use synapse_core::config::PrunePolicy;
use synapse_core::errors::SynapseResult;
use synapse_protocol::CausalEdge;
use synapse_storage::queries::causal_edge_ops;

/// Result of a pruning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneResult {
    pub edges_removed: usize,
    pub edges_remaining: u64,
    /// Edges updated at or after this instant were kept regardless of strength.
    pub cutoff_ms: i64,
}

/// Weak by confidence or by sample size.
pub fn is_weak(edge: &CausalEdge, policy: &PrunePolicy) -> bool {
    edge.confidence < policy.min_confidence || edge.sample_size < policy.min_sample_size
}

/// Weak and last updated before the retention cutoff.
pub fn is_prunable(edge: &CausalEdge, policy: &PrunePolicy, now_ms: i64) -> bool {
    is_weak(edge, policy) && edge.updated_at_ms < retention_cutoff(policy, now_ms)
}

pub fn retention_cutoff(policy: &PrunePolicy, now_ms: i64) -> i64 {
    let window_ms = i64::try_from(policy.retention_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
    now_ms.saturating_sub(window_ms)
}

/// Run one pass on `conn`. Callers wrap this in a transaction.
pub fn prune(conn: &Connection, policy: &PrunePolicy, now_ms: i64) -> SynapseResult<PruneResult> {
    let cutoff_ms = retention_cutoff(policy, now_ms);
    let edges_removed =
        causal_edge_ops::prune_edges(conn, policy.min_confidence, policy.min_sample_size, cutoff_ms)?;
    Ok(PruneResult {
        edges_removed,
        edges_remaining: causal_edge_ops::edge_count(conn)?,
        cutoff_ms,
    })
}
