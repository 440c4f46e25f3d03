//! Vector clock for causal ordering.
//!
//! Each node owns one logical counter and only ever increments its own entry.
//! Missing entries read as 0, so `{A:1}` and `{A:1, B:0}` are the same clock.
//!
//! # Examples
//!
//! ```
//! use synapse_crdt::{ClockOrdering, VectorClock};
//!
//! let a = VectorClock::new().incremented("node-a");
//! let b = VectorClock::new().incremented("node-b");
//! assert_eq!(a.compare(&b), ClockOrdering::Concurrent);
//!
//! let merged = a.merged(&b);
//! assert_eq!(merged.compare(&a), ClockOrdering::After);
//! assert_eq!(merged.get("node-b"), 1);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Causal relationship of one clock to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockOrdering {
    /// The left clock happened before the right one.
    Before,
    /// The left clock happened after the right one.
    After,
    /// Neither dominates: the two events are in conflict.
    Concurrent,
    Equal,
}

impl ClockOrdering {
    /// The ordering seen from the other side.
    pub fn inverse(self) -> Self {
        match self {
            Self::Before => Self::After,
            Self::After => Self::Before,
            other => other,
        }
    }
}

/// Node id → logical counter. Serializes as a flat JSON object.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorClock {
    entries: BTreeMap<String, u64>,
}

impl VectorClock {
    /// Create an empty clock.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Increment this node's entry by 1.
    pub fn increment(&mut self, node_id: &str) {
        *self.entries.entry(node_id.to_string()).or_insert(0) += 1;
    }

    /// Copy-on-write increment.
    pub fn incremented(&self, node_id: &str) -> Self {
        let mut next = self.clone();
        next.increment(node_id);
        next
    }

    /// Insert a zero entry for `node_id` if absent.
    pub fn ensure(&mut self, node_id: &str) {
        self.entries.entry(node_id.to_string()).or_insert(0);
    }

    /// Counter for a node (0 if absent).
    pub fn get(&self, node_id: &str) -> u64 {
        self.entries.get(node_id).copied().unwrap_or(0)
    }

    /// Entrywise maximum over the union of keys.
    pub fn merge(&mut self, other: &Self) {
        for (node_id, &theirs) in &other.entries {
            let entry = self.entries.entry(node_id.clone()).or_insert(0);
            *entry = (*entry).max(theirs);
        }
    }

    /// Copy-on-write merge.
    pub fn merged(&self, other: &Self) -> Self {
        let mut next = self.clone();
        next.merge(other);
        next
    }

    /// Compare over the union of keys, missing entries counting as 0.
    pub fn compare(&self, other: &Self) -> ClockOrdering {
        let mut self_ahead = false;
        let mut other_ahead = false;
        for node_id in self.entries.keys().chain(other.entries.keys()) {
            let mine = self.get(node_id);
            let theirs = other.get(node_id);
            if mine > theirs {
                self_ahead = true;
            } else if theirs > mine {
                other_ahead = true;
            }
            if self_ahead && other_ahead {
                return ClockOrdering::Concurrent;
            }
        }
        match (self_ahead, other_ahead) {
            (true, false) => ClockOrdering::After,
            (false, true) => ClockOrdering::Before,
            (false, false) => ClockOrdering::Equal,
            (true, true) => ClockOrdering::Concurrent,
        }
    }

    pub fn happens_before(&self, other: &Self) -> bool {
        self.compare(other) == ClockOrdering::Before
    }

    pub fn concurrent_with(&self, other: &Self) -> bool {
        self.compare(other) == ClockOrdering::Concurrent
    }

    /// True when every entry is `<=` the other's (`before` or `equal`).
    pub fn is_covered_by(&self, other: &Self) -> bool {
        matches!(
            self.compare(other),
            ClockOrdering::Before | ClockOrdering::Equal
        )
    }

    /// Causal delivery check: `self` is the next event from `origin` given
    /// what `local` has already applied.
    pub fn is_next_from(&self, origin: &str, local: &Self) -> bool {
        if self.get(origin) != local.get(origin) + 1 {
            return false;
        }
        self.entries
            .iter()
            .filter(|(node_id, _)| node_id.as_str() != origin)
            .all(|(node_id, &v)| v <= local.get(node_id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn nodes(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for VectorClock {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == ClockOrdering::Equal
    }
}

impl Eq for VectorClock {}

impl fmt::Debug for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (node_id, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{node_id}:{v}")?;
        }
        write!(f, "}}")
    }
}
