//! Last-Writer-Wins Register (LWW-Register) CRDT.
//!
//! Each write carries an epoch-millisecond timestamp and the writing node's
//! id. The greater `(timestamp, node_id)` pair wins, so equal timestamps are
//! broken by the lexicographically greater node id.
//!
//! # Examples
//!
//! ```
//! use synapse_crdt::LWWRegister;
//!
//! let mut a = LWWRegister::new("draft".to_string(), 100, "node-a");
//! let b = LWWRegister::new("final".to_string(), 100, "node-b");
//!
//! a.merge(&b);
//! assert_eq!(a.get(), "final");
//! ```

use serde::{Deserialize, Serialize};

/// A last-writer-wins register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LWWRegister<T> {
    value: T,
    timestamp: i64,
    node_id: String,
}

impl<T: Clone> LWWRegister<T> {
    pub fn new(value: T, timestamp: i64, node_id: impl Into<String>) -> Self {
        Self {
            value,
            timestamp,
            node_id: node_id.into(),
        }
    }

    /// Replace the value iff `(timestamp, node_id)` is greater than the current pair.
    /// Returns whether the write won.
    pub fn update(&mut self, value: T, node_id: &str, timestamp: i64) -> bool {
        if (timestamp, node_id) > (self.timestamp, self.node_id.as_str()) {
            self.value = value;
            self.timestamp = timestamp;
            self.node_id = node_id.to_string();
            true
        } else {
            false
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Keep the register with the greater `(timestamp, node_id)` pair.
    pub fn merge(&mut self, other: &Self) {
        if (other.timestamp, other.node_id.as_str()) > (self.timestamp, self.node_id.as_str()) {
            self.value = other.value.clone();
            self.timestamp = other.timestamp;
            self.node_id = other.node_id.clone();
        }
    }

    pub fn merged(&self, other: &Self) -> Self {
        let mut next = self.clone();
        next.merge(other);
        next
    }
}
