use serde::{Deserialize, Serialize};
use synapse_core::errors::ValidationError;
use synapse_crdt::{LWWRegister, ORSet};

use super::require_non_empty;

/// Scalar fields of an episode. Replaced as one unit under last-writer-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeContent {
    pub session_id: String,
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critique: Option<String>,
    pub reward: f64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
}

impl EpisodeContent {
    pub fn new(session_id: impl Into<String>, task: impl Into<String>, reward: f64, success: bool) -> Self {
        Self {
            session_id: session_id.into(),
            task: task.into(),
            input: None,
            output: None,
            critique: None,
            reward,
            success,
            latency_ms: None,
            tokens_used: None,
        }
    }
}

/// A recorded agent experience.
///
/// Scalars merge by LWW on `(timestamp, node_id)`, tags by OR-Set union, and
/// deletion is an LWW tombstone. Content and tag edits never touch the
/// tombstone, so a deleted episode stays deleted on every replica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRecord {
    pub id: String,
    pub created_at_ms: i64,
    pub origin_node: String,
    pub content: LWWRegister<EpisodeContent>,
    pub tags: ORSet<String>,
    pub deleted: LWWRegister<bool>,
}

impl EpisodeRecord {
    pub fn new(id: impl Into<String>, content: EpisodeContent, node_id: &str, now_ms: i64) -> Self {
        Self {
            id: id.into(),
            created_at_ms: now_ms,
            origin_node: node_id.to_string(),
            content: LWWRegister::new(content, now_ms, node_id),
            tags: ORSet::new(),
            deleted: LWWRegister::new(false, now_ms, node_id),
        }
    }

    /// A fresh random episode id.
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn update_content(&mut self, content: EpisodeContent, node_id: &str, now_ms: i64) -> bool {
        self.content.update(content, node_id, now_ms)
    }

    pub fn tombstone(&mut self, node_id: &str, now_ms: i64) -> bool {
        self.deleted.update(true, node_id, now_ms)
    }

    pub fn add_tag(&mut self, tag: impl Into<String>, node_id: &str) {
        self.tags.add(tag.into(), node_id);
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.remove(&tag.to_string());
    }

    pub fn is_deleted(&self) -> bool {
        *self.deleted.get()
    }

    /// Field-wise CRDT merge. Identity fields resolve to the earliest creation.
    pub fn merge(&mut self, other: &Self) {
        if (other.created_at_ms, other.origin_node.as_str())
            < (self.created_at_ms, self.origin_node.as_str())
        {
            self.created_at_ms = other.created_at_ms;
            self.origin_node = other.origin_node.clone();
        }
        self.content.merge(&other.content);
        self.tags.merge(&other.tags);
        self.deleted.merge(&other.deleted);
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("episode.id", &self.id)?;
        require_non_empty("episode.task", &self.content.get().task)?;
        if !self.content.get().reward.is_finite() {
            return Err(ValidationError::NotFinite {
                field: "episode.reward",
            });
        }
        Ok(())
    }
}
