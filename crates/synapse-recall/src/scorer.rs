//! Utility reranking: `alpha * similarity + beta * uplift - gamma * latency`.

use serde::{Deserialize, Serialize};
use synapse_core::config::RecallConfig;
use synapse_core::traits::VectorHit;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtilityWeights {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl UtilityWeights {
    pub fn new(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self { alpha, beta, gamma }
    }

    /// Latency enters in seconds.
    pub fn utility(&self, similarity: f64, uplift: f64, latency_ms: f64) -> f64 {
        self.alpha * similarity + self.beta * uplift - self.gamma * (latency_ms / 1000.0)
    }
}

impl From<&RecallConfig> for UtilityWeights {
    fn from(config: &RecallConfig) -> Self {
        Self::new(config.alpha, config.beta, config.gamma)
    }
}

impl Default for UtilityWeights {
    fn default() -> Self {
        Self::from(&RecallConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedMemory {
    pub id: String,
    pub memory_type: String,
    pub content: String,
    pub tags: Vec<String>,
    pub similarity: f64,
    /// Best known causal uplift, 0 without an estimated edge.
    pub uplift: f64,
    pub latency_ms: f64,
    pub utility: f64,
}

impl RankedMemory {
    pub fn score(hit: VectorHit, uplift: f64, weights: &UtilityWeights) -> Self {
        Self {
            utility: weights.utility(hit.similarity, uplift, hit.latency_ms),
            id: hit.id,
            memory_type: hit.memory_type,
            content: hit.content,
            tags: hit.tags,
            similarity: hit.similarity,
            uplift,
            latency_ms: hit.latency_ms,
        }
    }
}

/// Utility descending. Equal utilities keep the higher similarity first,
/// then the smaller id.
pub fn rank(mut memories: Vec<RankedMemory>) -> Vec<RankedMemory> {
    memories.sort_by(|a, b| {
        b.utility
            .total_cmp(&a.utility)
            .then_with(|| b.similarity.total_cmp(&a.similarity))
            .then_with(|| a.id.cmp(&b.id))
    });
    memories
}
