//! Shared builders, fakes and golden datasets for Synapse tests.
//!
//! Golden files live under `golden/` next to this crate and are loaded with
//! [`load_fixture`].

use std::path::PathBuf;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use synapse_core::errors::SynapseResult;
use synapse_core::traits::{IEmbeddingProvider, IVectorIndex, VectorHit};
use synapse_crdt::VectorClock;
use synapse_protocol::{
    CausalEdge, CausalEdgeSync, EpisodeContent, EpisodeOperation, EpisodeRecord, EpisodeSync,
    SyncMessage, SyncPayload,
};

/// Fixed epoch used by builders so tests are reproducible.
pub const T0: i64 = 1_700_000_000_000;

fn golden_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("golden")
}

/// Load and deserialize a golden JSON file.
///
/// # Panics
/// Panics if the file doesn't exist or can't be deserialized.
pub fn load_fixture<T: DeserializeOwned>(relative_path: &str) -> T {
    let path = golden_root().join(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

pub fn fixture_exists(relative_path: &str) -> bool {
    golden_root().join(relative_path).exists()
}

// ─── Golden dataset shapes ──────────────────────────────────────────────────

/// One experiment with expected uplift, from `golden/uplift/*.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpliftCase {
    pub name: String,
    pub treatment: Vec<f64>,
    pub control: Vec<f64>,
    pub expected_uplift: f64,
    pub tolerance: f64,
}

/// A recall scenario from `golden/recall/*.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallCase {
    pub name: String,
    pub query: String,
    pub requirements: Vec<String>,
    pub hits: Vec<VectorHit>,
    pub expected_minimal_why: Vec<String>,
    #[serde(default)]
    pub expected_unsatisfied: Vec<String>,
}

// ─── Builders ───────────────────────────────────────────────────────────────

pub fn clock(entries: &[(&str, u64)]) -> VectorClock {
    VectorClock::from_entries(entries.iter().map(|(node, v)| (*node, *v)))
}

pub fn episode(id: &str, task: &str, node_id: &str, now_ms: i64) -> EpisodeRecord {
    EpisodeRecord::new(id, EpisodeContent::new("session-1", task, 0.5, true), node_id, now_ms)
}

/// A create message for `episode`, stamped with `clock_entries`.
pub fn episode_message(
    sequence_number: u64,
    node_id: &str,
    clock_entries: &[(&str, u64)],
    episode: EpisodeRecord,
) -> SyncMessage {
    SyncMessage {
        sequence_number,
        timestamp_ms: episode.created_at_ms,
        node_id: node_id.to_string(),
        vector_clock: clock(clock_entries),
        payload: SyncPayload::Episode(EpisodeSync {
            operation: EpisodeOperation::Create,
            episode,
        }),
    }
}

pub fn edge(from: &str, to: &str, uplift: f64, confidence: f64, sample_size: u64) -> CausalEdge {
    node_edge("node-fixture", from, to, uplift, confidence, sample_size)
}

/// An `edge` whose estimate is contributed by `node_id`.
pub fn node_edge(node_id: &str, from: &str, to: &str, uplift: f64, confidence: f64, sample_size: u64) -> CausalEdge {
    CausalEdge::new((from, "episode"), (to, "episode"), 0.5, node_id, T0)
        .with_estimate(uplift, confidence, sample_size)
}

pub fn edge_message(
    sequence_number: u64,
    node_id: &str,
    clock_entries: &[(&str, u64)],
    edge: CausalEdge,
) -> SyncMessage {
    SyncMessage {
        sequence_number,
        timestamp_ms: edge.updated_at_ms,
        node_id: node_id.to_string(),
        vector_clock: clock(clock_entries),
        payload: SyncPayload::CausalEdge(CausalEdgeSync::from_edge(edge)),
    }
}

pub fn hit(id: &str, content: &str, similarity: f64, latency_ms: f64, tags: &[&str]) -> VectorHit {
    VectorHit {
        id: id.to_string(),
        memory_type: "episode".to_string(),
        content: content.to_string(),
        similarity,
        latency_ms,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

// ─── Fakes ──────────────────────────────────────────────────────────────────

/// Deterministic embedder: byte histogram folded into `dims` buckets.
pub struct FakeEmbedder {
    pub dims: usize,
}

impl IEmbeddingProvider for FakeEmbedder {
    fn embed(&self, text: &str) -> SynapseResult<Vec<f32>> {
        let mut v = vec![0.0f32; self.dims.max(1)];
        for (i, b) in text.bytes().enumerate() {
            let idx = (b as usize + i) % v.len();
            v[idx] += 1.0;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Vector index returning a canned hit list, truncated to `k`. Records every
/// query length it sees.
pub struct FakeVectorIndex {
    hits: Vec<VectorHit>,
    pub queries: Mutex<Vec<usize>>,
}

impl FakeVectorIndex {
    pub fn new(hits: Vec<VectorHit>) -> Self {
        Self {
            hits,
            queries: Mutex::new(Vec::new()),
        }
    }
}

impl IVectorIndex for FakeVectorIndex {
    fn search(&self, query: &[f32], k: usize) -> SynapseResult<Vec<VectorHit>> {
        if let Ok(mut q) = self.queries.lock() {
            q.push(query.len());
        }
        let mut hits = self.hits.clone();
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(k);
        Ok(hits)
    }
}
