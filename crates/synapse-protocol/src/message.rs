//! The sync envelope and its tagged payloads.
//!
//! Every payload variant is produced by exactly one originating node and is
//! immutable once sent. Consumers match [`SyncPayload`] exhaustively.

use serde::{Deserialize, Serialize};
use synapse_crdt::VectorClock;

use crate::records::{CausalEdge, EpisodeRecord, SkillRecord};

/// Envelope for one synchronized change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMessage {
    /// Per-origin monotonically increasing number. `(node_id, sequence_number)`
    /// identifies the change across retries.
    pub sequence_number: u64,
    pub timestamp_ms: i64,
    /// Originating node.
    pub node_id: String,
    /// Origin's clock right after the change was recorded.
    pub vector_clock: VectorClock,
    pub payload: SyncPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SyncPayload {
    Episode(EpisodeSync),
    Skill(SkillSync),
    CausalEdge(CausalEdgeSync),
    ReconciliationRequest(ReconciliationRequest),
    ReconciliationResponse(ReconciliationResponse),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeOperation {
    Create,
    Update,
    Delete,
}

impl EpisodeOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeSync {
    pub operation: EpisodeOperation,
    pub episode: EpisodeRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSync {
    pub skill: SkillRecord,
}

/// Bookkeeping carried with an edge so receivers can audit merges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResolutionMetadata {
    pub evidence_count: u64,
    pub last_modified_by: String,
    pub last_modified_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CausalEdgeSync {
    pub edge: CausalEdge,
    pub metadata: ConflictResolutionMetadata,
}

impl CausalEdgeSync {
    pub fn from_edge(edge: CausalEdge) -> Self {
        let metadata = ConflictResolutionMetadata {
            evidence_count: edge.evidence_ids.len() as u64,
            last_modified_by: edge.last_modified_by.clone(),
            last_modified_at_ms: edge.updated_at_ms,
        };
        Self { edge, metadata }
    }
}

/// Ask the hub for the full tenant state, e.g. after local data loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationRequest {
    pub reason: String,
    pub known_clock: VectorClock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResponse {
    pub records: Vec<SyncMessage>,
    pub hub_clock: VectorClock,
}

/// Coarse classification used for storage columns and scope checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Episode,
    Skill,
    CausalEdge,
    Reconciliation,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Episode => "episode",
            Self::Skill => "skill",
            Self::CausalEdge => "causal_edge",
            Self::Reconciliation => "reconciliation",
        }
    }
}

impl SyncMessage {
    pub fn kind(&self) -> RecordKind {
        match &self.payload {
            SyncPayload::Episode(_) => RecordKind::Episode,
            SyncPayload::Skill(_) => RecordKind::Skill,
            SyncPayload::CausalEdge(_) => RecordKind::CausalEdge,
            SyncPayload::ReconciliationRequest(_) | SyncPayload::ReconciliationResponse(_) => {
                RecordKind::Reconciliation
            }
        }
    }

    /// Id of the record this change targets. Causal edges use `from->to`.
    pub fn record_id(&self) -> String {
        match &self.payload {
            SyncPayload::Episode(sync) => sync.episode.id.clone(),
            SyncPayload::Skill(sync) => sync.skill.skill_id.clone(),
            SyncPayload::CausalEdge(sync) => {
                format!("{}->{}", sync.edge.from_memory_id, sync.edge.to_memory_id)
            }
            SyncPayload::ReconciliationRequest(_) | SyncPayload::ReconciliationResponse(_) => {
                String::new()
            }
        }
    }

    /// Change-log operation label.
    pub fn operation(&self) -> &'static str {
        match &self.payload {
            SyncPayload::Episode(sync) => sync.operation.as_str(),
            SyncPayload::Skill(_) | SyncPayload::CausalEdge(_) => "upsert",
            SyncPayload::ReconciliationRequest(_) => "reconcile_request",
            SyncPayload::ReconciliationResponse(_) => "reconcile_response",
        }
    }

    /// Boundary validation of the carried record.
    pub fn validate(&self) -> Result<(), synapse_core::errors::ValidationError> {
        if self.node_id.trim().is_empty() {
            return Err(synapse_core::errors::ValidationError::Empty {
                field: "message.node_id",
            });
        }
        match &self.payload {
            SyncPayload::Episode(sync) => sync.episode.validate(),
            SyncPayload::Skill(sync) => sync.skill.validate(),
            SyncPayload::CausalEdge(sync) => sync.edge.validate(),
            SyncPayload::ReconciliationRequest(_) | SyncPayload::ReconciliationResponse(_) => Ok(()),
        }
    }
}
