//! Applying one delivered remote record to local state.
//!
//! `ordering` is `compare(local, remote)` at delivery time. `Before` means
//! the remote state already includes everything this agent has seen, so it
//! replaces the local copy. `Concurrent` means both sides changed
//! independently and the record's CRDT fields are merged.
//!
//! Causal edges always merge: their estimates are per-node state, and a
//! superseding remote edge wins the last-writer fields of the merge anyway.

use rusqlite::Connection;
use synapse_core::errors::SynapseResult;
use synapse_crdt::ClockOrdering;
use synapse_protocol::{CausalEdge, EpisodeRecord, SkillRecord, SyncMessage, SyncPayload};
use synapse_storage::queries::{causal_edge_ops, episode_ops, skill_ops};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No local copy existed.
    Inserted,
    /// The remote state superseded the local copy.
    Replaced,
    /// Concurrent update resolved by CRDT merge.
    Merged,
    /// Nothing to apply (reconciliation envelopes, stale orderings).
    Ignored,
}

impl MergeOutcome {
    pub fn is_conflict(self) -> bool {
        self == Self::Merged
    }
}

pub fn apply_remote(
    conn: &Connection,
    message: &SyncMessage,
    ordering: ClockOrdering,
    now_ms: i64,
) -> SynapseResult<MergeOutcome> {
    if matches!(ordering, ClockOrdering::Equal | ClockOrdering::After) {
        return Ok(MergeOutcome::Ignored);
    }
    let outcome = match &message.payload {
        SyncPayload::Episode(sync) => apply_episode(conn, &sync.episode, ordering)?,
        SyncPayload::Skill(sync) => apply_skill(conn, &sync.skill, ordering, now_ms)?,
        SyncPayload::CausalEdge(sync) => apply_edge(conn, &sync.edge, ordering)?,
        SyncPayload::ReconciliationRequest(_) | SyncPayload::ReconciliationResponse(_) => {
            MergeOutcome::Ignored
        }
    };
    debug!(
        record_id = %message.record_id(),
        origin = %message.node_id,
        ?ordering,
        ?outcome,
        "applied remote record"
    );
    Ok(outcome)
}

fn apply_episode(conn: &Connection, remote: &EpisodeRecord, ordering: ClockOrdering) -> SynapseResult<MergeOutcome> {
    let Some(mut local) = episode_ops::get_episode(conn, &remote.id)? else {
        episode_ops::upsert_episode(conn, remote)?;
        return Ok(MergeOutcome::Inserted);
    };
    if ordering == ClockOrdering::Before {
        episode_ops::upsert_episode(conn, remote)?;
        return Ok(MergeOutcome::Replaced);
    }
    local.merge(remote);
    episode_ops::upsert_episode(conn, &local)?;
    Ok(MergeOutcome::Merged)
}

fn apply_skill(
    conn: &Connection,
    remote: &SkillRecord,
    ordering: ClockOrdering,
    now_ms: i64,
) -> SynapseResult<MergeOutcome> {
    let Some(mut local) = skill_ops::get_skill(conn, &remote.skill_id)? else {
        skill_ops::upsert_skill(conn, remote, now_ms)?;
        return Ok(MergeOutcome::Inserted);
    };
    if ordering == ClockOrdering::Before {
        skill_ops::upsert_skill(conn, remote, now_ms)?;
        return Ok(MergeOutcome::Replaced);
    }
    local.merge(remote);
    skill_ops::upsert_skill(conn, &local, now_ms)?;
    Ok(MergeOutcome::Merged)
}

fn apply_edge(conn: &Connection, remote: &CausalEdge, ordering: ClockOrdering) -> SynapseResult<MergeOutcome> {
    let Some(local) = causal_edge_ops::get_edge(conn, &remote.from_memory_id, &remote.to_memory_id)? else {
        causal_edge_ops::upsert_edge(conn, remote)?;
        return Ok(MergeOutcome::Inserted);
    };
    causal_edge_ops::upsert_edge(conn, &local.merge_concurrent(remote))?;
    if ordering == ClockOrdering::Before {
        return Ok(MergeOutcome::Replaced);
    }
    Ok(MergeOutcome::Merged)
}
