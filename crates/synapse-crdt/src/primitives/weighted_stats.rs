//! Outcome statistics that merge as a CRDT.
//!
//! Each node keeps running sums over the samples it observed itself. Merge
//! keeps, per node, the entry that has seen more samples. The exposed means
//! are the sample-size-weighted average across nodes.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Running sums contributed by one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSample {
    pub samples: u64,
    pub successes: u64,
    pub reward_sum: f64,
    pub latency_sum_ms: f64,
}

impl NodeSample {
    fn dominance(&self, other: &Self) -> Ordering {
        self.samples
            .cmp(&other.samples)
            .then(self.successes.cmp(&other.successes))
            .then(self.reward_sum.total_cmp(&other.reward_sum))
            .then(self.latency_sum_ms.total_cmp(&other.latency_sum_ms))
    }
}

/// Per-node outcome sums. Views are weighted by sample size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedStats {
    nodes: BTreeMap<String, NodeSample>,
}

impl WeightedStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome observed by `node_id`.
    pub fn record(&mut self, node_id: &str, success: bool, reward: f64, latency_ms: f64) {
        let entry = self.nodes.entry(node_id.to_string()).or_default();
        entry.samples += 1;
        if success {
            entry.successes += 1;
        }
        entry.reward_sum += reward;
        entry.latency_sum_ms += latency_ms;
    }

    pub fn sample_size(&self) -> u64 {
        self.nodes.values().map(|s| s.samples).sum()
    }

    pub fn success_rate(&self) -> f64 {
        self.ratio(|s| s.successes as f64)
    }

    pub fn mean_reward(&self) -> f64 {
        self.ratio(|s| s.reward_sum)
    }

    pub fn mean_latency_ms(&self) -> f64 {
        self.ratio(|s| s.latency_sum_ms)
    }

    pub fn node(&self, node_id: &str) -> Option<&NodeSample> {
        self.nodes.get(node_id)
    }

    /// Per node, keep the entry that has observed more.
    pub fn merge(&mut self, other: &Self) {
        for (node_id, theirs) in &other.nodes {
            match self.nodes.get_mut(node_id) {
                Some(mine) if mine.dominance(theirs) != Ordering::Less => {}
                Some(mine) => *mine = *theirs,
                None => {
                    self.nodes.insert(node_id.clone(), *theirs);
                }
            }
        }
    }

    pub fn merged(&self, other: &Self) -> Self {
        let mut next = self.clone();
        next.merge(other);
        next
    }

    fn ratio<F: Fn(&NodeSample) -> f64>(&self, numerator: F) -> f64 {
        let n = self.sample_size();
        if n == 0 {
            return 0.0;
        }
        self.nodes.values().map(numerator).sum::<f64>() / n as f64
    }
}

/// Weighted average of `(value, weight)` pairs. Zero total weight yields the plain mean.
pub fn weighted_mean(pairs: &[(f64, u64)]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    let total: u64 = pairs.iter().map(|&(_, w)| w).sum();
    if total == 0 {
        return pairs.iter().map(|&(v, _)| v).sum::<f64>() / pairs.len() as f64;
    }
    pairs.iter().map(|&(v, w)| v * w as f64).sum::<f64>() / total as f64
}
