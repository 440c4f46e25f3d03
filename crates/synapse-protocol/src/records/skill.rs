use serde::{Deserialize, Serialize};
use synapse_core::errors::ValidationError;
use synapse_crdt::{GCounter, LWWRegister, ORSet, WeightedStats};

use super::require_non_empty;

/// One observed use of a skill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillOutcome {
    pub success: bool,
    pub reward: f64,
    pub latency_ms: f64,
}

/// A reusable skill with federated usage statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRecord {
    pub skill_id: String,
    pub name: LWWRegister<String>,
    pub description: LWWRegister<String>,
    pub usage: GCounter,
    pub stats: WeightedStats,
    pub source_episodes: ORSet<String>,
}

impl SkillRecord {
    pub fn new(
        skill_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        node_id: &str,
        now_ms: i64,
    ) -> Self {
        Self {
            skill_id: skill_id.into(),
            name: LWWRegister::new(name.into(), now_ms, node_id),
            description: LWWRegister::new(description.into(), now_ms, node_id),
            usage: GCounter::new(),
            stats: WeightedStats::new(),
            source_episodes: ORSet::new(),
        }
    }

    /// Count one use and fold its outcome into this node's statistics.
    pub fn record_use(&mut self, node_id: &str, outcome: &SkillOutcome) {
        self.usage.increment(node_id, 1);
        self.stats
            .record(node_id, outcome.success, outcome.reward, outcome.latency_ms);
    }

    pub fn link_episode(&mut self, episode_id: impl Into<String>, node_id: &str) {
        self.source_episodes.add(episode_id.into(), node_id);
    }

    pub fn usage_count(&self) -> u64 {
        self.usage.value()
    }

    pub fn merge(&mut self, other: &Self) {
        self.name.merge(&other.name);
        self.description.merge(&other.description);
        self.usage.merge(&other.usage);
        self.stats.merge(&other.stats);
        self.source_episodes.merge(&other.source_episodes);
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("skill.skill_id", &self.skill_id)?;
        require_non_empty("skill.name", self.name.get())
    }
}
