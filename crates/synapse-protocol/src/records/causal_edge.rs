use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use synapse_core::errors::ValidationError;
use synapse_crdt::{EstimateSet, VectorClock};

use super::{require_non_empty, require_unit_range};

/// A directed, evidenced relationship between two memory items.
///
/// Keyed by `(from_memory_id, to_memory_id)`. The numeric estimate lives in
/// `estimates`, one revisioned entry per contributing node; `uplift`,
/// `confidence` and `sample_size` are its pooled view and are recomputed
/// whenever `estimates` changes. An edge with `sample_size == 0` carries no
/// uplift estimate and is never ranked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CausalEdge {
    pub edge_id: String,
    pub from_memory_id: String,
    pub from_memory_type: String,
    pub to_memory_id: String,
    pub to_memory_type: String,
    pub similarity: f64,
    pub uplift: f64,
    pub confidence: f64,
    pub sample_size: u64,
    #[serde(default)]
    pub estimates: EstimateSet,
    pub evidence_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confounder_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mechanism: Option<String>,
    pub version: VectorClock,
    pub last_modified_by: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl CausalEdge {
    /// A new edge with no evidence yet.
    pub fn new(
        from: (&str, &str),
        to: (&str, &str),
        similarity: f64,
        node_id: &str,
        now_ms: i64,
    ) -> Self {
        Self {
            edge_id: uuid::Uuid::new_v4().to_string(),
            from_memory_id: from.0.to_string(),
            from_memory_type: from.1.to_string(),
            to_memory_id: to.0.to_string(),
            to_memory_type: to.1.to_string(),
            similarity,
            uplift: 0.0,
            confidence: 0.0,
            sample_size: 0,
            estimates: EstimateSet::new(),
            evidence_ids: Vec::new(),
            confounder_score: None,
            mechanism: None,
            version: VectorClock::new(),
            last_modified_by: node_id.to_string(),
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }

    /// Set the estimate contributed by `last_modified_by`.
    pub fn with_estimate(mut self, uplift: f64, confidence: f64, sample_size: u64) -> Self {
        let node_id = self.last_modified_by.clone();
        self.estimates = self.contributions();
        self.estimates.set(&node_id, uplift, confidence, sample_size);
        self.refresh_view();
        self
    }

    /// Credit the edge, and the estimate made under its last writer, to
    /// `node_id`.
    pub fn attributed_to(mut self, node_id: &str) -> Self {
        self.estimates = self.contributions();
        self.estimates.reassign(&self.last_modified_by, node_id);
        self.last_modified_by = node_id.to_string();
        self.refresh_view();
        self
    }

    pub fn with_evidence<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = self
            .evidence_ids
            .drain(..)
            .chain(ids.into_iter().map(Into::into))
            .collect();
        self.evidence_ids = set.into_iter().collect();
        self
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.from_memory_id, &self.to_memory_id)
    }

    /// Whether the edge participates in uplift ranking.
    pub fn is_rankable(&self) -> bool {
        self.sample_size > 0
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("edge.from_memory_id", &self.from_memory_id)?;
        require_non_empty("edge.to_memory_id", &self.to_memory_id)?;
        if self.from_memory_id == self.to_memory_id {
            return Err(ValidationError::SelfLoop {
                memory_id: self.from_memory_id.clone(),
            });
        }
        require_unit_range("edge.similarity", self.similarity)?;
        require_unit_range("edge.confidence", self.confidence)?;
        if !self.uplift.is_finite() {
            return Err(ValidationError::NotFinite { field: "edge.uplift" });
        }
        for (_, estimate) in self.estimates.iter() {
            require_unit_range("edge.confidence", estimate.confidence)?;
            if !estimate.uplift.is_finite() {
                return Err(ValidationError::NotFinite { field: "edge.uplift" });
            }
        }
        if let Some(score) = self.confounder_score {
            require_unit_range("edge.confounder_score", score)?;
        }
        Ok(())
    }

    /// This edge as a local rewrite of `stored`, the copy already held for
    /// the same key. Identity and creation time come from `stored`, other
    /// nodes' estimates are kept and this node's entries supersede theirs,
    /// evidence and versions accumulate, and the write time moves past the
    /// stored one so the rewrite also wins on last-writer order.
    pub fn superseding(mut self, stored: &Self) -> Self {
        self.edge_id = stored.edge_id.clone();
        self.created_at_ms = stored.created_at_ms;
        self.estimates = self.contributions();
        self.estimates.rebase(&stored.contributions());
        self.refresh_view();
        self = self.with_evidence(stored.evidence_ids.iter().cloned());
        self.version.merge(&stored.version);
        self.updated_at_ms = self.updated_at_ms.max(stored.updated_at_ms.saturating_add(1));
        self
    }

    /// Merge two versions of the same edge.
    ///
    /// Estimates merge per node, evidence and versions are unioned, and the
    /// descriptive fields follow the later writer. Commutative, associative
    /// and idempotent.
    pub fn merge_concurrent(&self, other: &Self) -> Self {
        let winner = if lww_order(self, other) == Ordering::Less { other } else { self };
        let estimates = self.contributions().merged(&other.contributions());
        let evidence: BTreeSet<&String> = self.evidence_ids.iter().chain(&other.evidence_ids).collect();

        let mut merged = Self {
            edge_id: self.edge_id.clone().min(other.edge_id.clone()),
            from_memory_id: self.from_memory_id.clone(),
            from_memory_type: winner.from_memory_type.clone(),
            to_memory_id: self.to_memory_id.clone(),
            to_memory_type: winner.to_memory_type.clone(),
            similarity: winner.similarity,
            uplift: 0.0,
            confidence: 0.0,
            sample_size: 0,
            estimates,
            evidence_ids: evidence.into_iter().cloned().collect(),
            confounder_score: winner.confounder_score,
            mechanism: winner.mechanism.clone(),
            version: self.version.merged(&other.version),
            last_modified_by: winner.last_modified_by.clone(),
            created_at_ms: self.created_at_ms.min(other.created_at_ms),
            updated_at_ms: winner.updated_at_ms,
        };
        merged.refresh_view();
        merged
    }

    /// The per-node estimates. An edge that only carries a bare view (no
    /// entries) counts as a single contribution by its last writer.
    fn contributions(&self) -> EstimateSet {
        let mut set = self.estimates.clone();
        let has_view = self.sample_size > 0 || self.uplift != 0.0 || self.confidence != 0.0;
        if set.is_empty() && has_view {
            set.set(&self.last_modified_by, self.uplift, self.confidence, self.sample_size);
        }
        set
    }

    fn refresh_view(&mut self) {
        if self.estimates.is_empty() {
            return;
        }
        self.uplift = self.estimates.uplift();
        self.confidence = self.estimates.confidence();
        self.sample_size = self.estimates.sample_size();
    }
}

/// Total order over the last-writer fields. Only fields the winner passes on
/// unchanged take part, so the order of a merged edge is its winner's.
fn lww_order(a: &CausalEdge, b: &CausalEdge) -> Ordering {
    a.updated_at_ms
        .cmp(&b.updated_at_ms)
        .then_with(|| a.last_modified_by.cmp(&b.last_modified_by))
        .then_with(|| a.similarity.total_cmp(&b.similarity))
        .then_with(|| a.mechanism.cmp(&b.mechanism))
        .then_with(|| a.from_memory_type.cmp(&b.from_memory_type))
        .then_with(|| a.to_memory_type.cmp(&b.to_memory_type))
        .then_with(|| {
            let (x, y) = (a.confounder_score, b.confounder_score);
            x.is_some()
                .cmp(&y.is_some())
                .then_with(|| x.unwrap_or(0.0).total_cmp(&y.unwrap_or(0.0)))
        })
}
