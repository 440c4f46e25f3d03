//! Per-node effect estimates that merge as a CRDT.
//!
//! Every node owns one entry: its latest `(uplift, confidence, samples)`
//! together with a revision it bumps on each new estimate. Merge keeps, per
//! node, the dominant entry (higher revision, ties broken on the values), so
//! merging is a per-key max over a total order. The pooled view weights each
//! node's estimate by its sample count.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::weighted_stats::weighted_mean;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEstimate {
    pub revision: u64,
    pub samples: u64,
    pub uplift: f64,
    pub confidence: f64,
}

impl NodeEstimate {
    fn dominance(&self, other: &Self) -> Ordering {
        self.revision
            .cmp(&other.revision)
            .then(self.samples.cmp(&other.samples))
            .then(self.uplift.total_cmp(&other.uplift))
            .then(self.confidence.total_cmp(&other.confidence))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EstimateSet {
    nodes: BTreeMap<String, NodeEstimate>,
}

impl EstimateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `node_id`'s estimate with a new revision.
    pub fn set(&mut self, node_id: &str, uplift: f64, confidence: f64, samples: u64) {
        let revision = self.nodes.get(node_id).map_or(0, |e| e.revision) + 1;
        self.nodes.insert(
            node_id.to_string(),
            NodeEstimate {
                revision,
                samples,
                uplift,
                confidence,
            },
        );
    }

    pub fn get(&self, node_id: &str) -> Option<&NodeEstimate> {
        self.nodes.get(node_id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeEstimate)> {
        self.nodes.iter().map(|(node, e)| (node.as_str(), e))
    }

    pub fn sample_size(&self) -> u64 {
        self.nodes.values().fold(0u64, |n, e| n.saturating_add(e.samples))
    }

    /// Sample-weighted mean uplift; plain mean when no entry has samples.
    pub fn uplift(&self) -> f64 {
        weighted_mean(&self.pairs(|e| e.uplift))
    }

    pub fn confidence(&self) -> f64 {
        weighted_mean(&self.pairs(|e| e.confidence)).clamp(0.0, 1.0)
    }

    /// Per node, keep the dominant entry.
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

    /// Move `from`'s entry to `to`, past any revision `to` already holds.
    pub fn reassign(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        let Some(mut entry) = self.nodes.remove(from) else {
            return;
        };
        if let Some(existing) = self.nodes.get(to) {
            entry.revision = entry.revision.max(existing.revision + 1);
        }
        self.nodes.insert(to.to_string(), entry);
    }

    /// Make this set a local successor of `base`: entries only `base` has
    /// are adopted, and every entry this set carries is re-revisioned past
    /// `base`'s entry for the same node so it wins any later merge.
    pub fn rebase(&mut self, base: &Self) {
        for (node_id, theirs) in &base.nodes {
            match self.nodes.get_mut(node_id) {
                Some(mine) => mine.revision = mine.revision.max(theirs.revision + 1),
                None => {
                    self.nodes.insert(node_id.clone(), *theirs);
                }
            }
        }
    }

    fn pairs<F: Fn(&NodeEstimate) -> f64>(&self, value: F) -> Vec<(f64, u64)> {
        self.nodes.values().map(|e| (value(e), e.samples)).collect()
    }
}
