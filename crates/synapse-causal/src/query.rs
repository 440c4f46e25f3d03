//! Filtering and ranking of causal effects.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use synapse_protocol::CausalEdge;

/// All set fields must hold for an edge to match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EffectFilter {
    /// Only edges leaving this memory.
    pub intervention_memory_id: Option<String>,
    pub min_confidence: Option<f64>,
    pub min_uplift: Option<f64>,
    /// Edges without samples carry no estimate and are skipped unless set.
    pub include_unestimated: bool,
}

impl EffectFilter {
    pub fn from_intervention(memory_id: impl Into<String>) -> Self {
        Self {
            intervention_memory_id: Some(memory_id.into()),
            ..Self::default()
        }
    }

    pub fn min_confidence(mut self, value: f64) -> Self {
        self.min_confidence = Some(value);
        self
    }

    pub fn min_uplift(mut self, value: f64) -> Self {
        self.min_uplift = Some(value);
        self
    }

    pub fn matches(&self, edge: &CausalEdge) -> bool {
        if !self.include_unestimated && !edge.is_rankable() {
            return false;
        }
        if let Some(id) = &self.intervention_memory_id {
            if edge.from_memory_id != *id {
                return false;
            }
        }
        if self.min_confidence.is_some_and(|min| edge.confidence < min) {
            return false;
        }
        if self.min_uplift.is_some_and(|min| edge.uplift < min) {
            return false;
        }
        true
    }
}

/// Uplift descending, then confidence descending. The edge key breaks any
/// remaining tie so the order is stable across calls.
pub fn effect_order(a: &CausalEdge, b: &CausalEdge) -> Ordering {
    b.uplift
        .total_cmp(&a.uplift)
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| a.key().cmp(&b.key()))
}

pub fn rank_effects(edges: Vec<CausalEdge>, filter: &EffectFilter) -> Vec<CausalEdge> {
    let mut matched: Vec<CausalEdge> = edges.into_iter().filter(|e| filter.matches(e)).collect();
    matched.sort_by(effect_order);
    matched
}
