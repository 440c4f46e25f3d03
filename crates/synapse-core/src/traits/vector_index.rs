use serde::{Deserialize, Serialize};

use crate::errors::SynapseResult;

/// A similarity candidate returned by the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: String,
    pub memory_type: String,
    pub content: String,
    /// Similarity in `[0, 1]`, higher is closer.
    pub similarity: f64,
    /// Expected cost of using this memory, in milliseconds.
    pub latency_ms: f64,
    pub tags: Vec<String>,
}

/// Nearest-neighbour index over embedded memories.
pub trait IVectorIndex: Send + Sync {
    /// Return at most `k` hits ordered by similarity descending.
    fn search(&self, query: &[f32], k: usize) -> SynapseResult<Vec<VectorHit>>;
}
