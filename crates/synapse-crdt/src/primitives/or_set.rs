//! Observed-Remove Set (OR-Set) CRDT with add-wins semantics.
//!
//! Each add creates a globally unique tag (node id, timestamp, random
//! suffix). Remove tombstones only the tags observed at the time of removal,
//! so a concurrent or later re-add survives.
//!
//! Used for episode tags and skill source-episode sets.
//!
//! # Examples
//!
//! ```
//! use synapse_crdt::ORSet;
//!
//! let mut set = ORSet::new();
//! set.add("retry".to_string(), "node-1");
//! assert!(set.contains(&"retry".to_string()));
//!
//! set.remove(&"retry".to_string());
//! assert!(!set.contains(&"retry".to_string()));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A unique tag identifying one add operation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueTag {
    pub node_id: String,
    pub timestamp_ms: i64,
    pub nonce: String,
}

impl UniqueTag {
    /// A fresh tag for `node_id` stamped with the current time.
    pub fn fresh(node_id: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            nonce: uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}

/// An observed-remove set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize + Ord",
    deserialize = "T: Deserialize<'de> + Ord"
))]
pub struct ORSet<T> {
    adds: BTreeMap<T, BTreeSet<UniqueTag>>,
    removes: BTreeSet<UniqueTag>,
}

impl<T: Ord + Clone> ORSet<T> {
    pub fn new() -> Self {
        Self {
            adds: BTreeMap::new(),
            removes: BTreeSet::new(),
        }
    }

    /// Add an element under a freshly generated tag.
    pub fn add(&mut self, element: T, node_id: &str) -> UniqueTag {
        let tag = UniqueTag::fresh(node_id);
        self.add_tagged(element, tag.clone());
        tag
    }

    /// Add an element under a caller-supplied tag.
    pub fn add_tagged(&mut self, element: T, tag: UniqueTag) {
        self.adds.entry(element).or_default().insert(tag);
    }

    /// Tombstone every tag currently observed for `element`.
    pub fn remove(&mut self, element: &T) {
        if let Some(tags) = self.adds.get(element) {
            self.removes.extend(tags.iter().cloned());
        }
    }

    /// Present iff at least one add tag is not tombstoned.
    pub fn contains(&self, element: &T) -> bool {
        self.adds
            .get(element)
            .is_some_and(|tags| tags.iter().any(|tag| !self.removes.contains(tag)))
    }

    /// Visible elements in sorted order.
    pub fn elements(&self) -> Vec<&T> {
        self.adds
            .iter()
            .filter(|(_, tags)| tags.iter().any(|tag| !self.removes.contains(tag)))
            .map(|(element, _)| element)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.elements().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Union of adds per element and union of removes.
    pub fn merge(&mut self, other: &Self) {
        for (element, tags) in &other.adds {
            self.adds
                .entry(element.clone())
                .or_default()
                .extend(tags.iter().cloned());
        }
        self.removes.extend(other.removes.iter().cloned());
    }

    pub fn merged(&self, other: &Self) -> Self {
        let mut next = self.clone();
        next.merge(other);
        next
    }
}

impl<T: Ord + Clone> Default for ORSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
