//! Grow-only counter (G-Counter) CRDT.
//!
//! Each node maintains its own counter. The total value is the sum of all
//! node counters. Merge takes the per-node maximum.
//!
//! Used for skill usage counts.
//!
//! # Examples
//!
//! ```
//! use synapse_crdt::GCounter;
//!
//! let mut a = GCounter::new();
//! a.increment("node-1", 2);
//!
//! let mut b = GCounter::new();
//! b.increment("node-2", 1);
//!
//! a.merge(&b);
//! assert_eq!(a.value(), 3);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A grow-only counter. Merge = per-node max. Value = sum of all counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GCounter {
    counts: BTreeMap<String, u64>,
}

impl GCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` to this node's entry.
    pub fn increment(&mut self, node_id: &str, delta: u64) {
        let entry = self.counts.entry(node_id.to_string()).or_insert(0);
        *entry = entry.saturating_add(delta);
    }

    /// Total across all nodes.
    pub fn value(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn node_value(&self, node_id: &str) -> u64 {
        self.counts.get(node_id).copied().unwrap_or(0)
    }

    /// Per-node max. `merge(A, B).value() >= max(A.value(), B.value())`.
    pub fn merge(&mut self, other: &Self) {
        for (node_id, &theirs) in &other.counts {
            let entry = self.counts.entry(node_id.clone()).or_insert(0);
            *entry = (*entry).max(theirs);
        }
    }

    pub fn merged(&self, other: &Self) -> Self {
        let mut next = self.clone();
        next.merge(other);
        next
    }
}
