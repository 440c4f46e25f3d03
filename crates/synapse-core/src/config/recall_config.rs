use serde::{Deserialize, Serialize};

use super::defaults;

/// Algorithm used to pick the certificate's minimal chunk subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HittingSetStrategy {
    /// Repeatedly take the chunk covering the most uncovered requirements.
    Greedy,
    /// Search subsets by increasing size. Falls back to greedy above `max_chunks` candidates.
    Exhaustive { max_chunks: usize },
}

impl Default for HittingSetStrategy {
    fn default() -> Self {
        Self::Greedy
    }
}

/// Utility reranking and certificate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    /// Similarity weight.
    pub alpha: f64,
    /// Causal uplift weight.
    pub beta: f64,
    /// Latency penalty weight.
    pub gamma: f64,
    pub default_k: usize,
    pub hitting_set: HittingSetStrategy,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            alpha: defaults::DEFAULT_RECALL_ALPHA,
            beta: defaults::DEFAULT_RECALL_BETA,
            gamma: defaults::DEFAULT_RECALL_GAMMA,
            default_k: defaults::DEFAULT_RECALL_K,
            hitting_set: HittingSetStrategy::Greedy,
        }
    }
}
