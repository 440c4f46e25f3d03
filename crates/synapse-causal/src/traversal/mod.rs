//! Intervention chains: breadth-first search for every simple path between
//! two memories, bounded by depth.

use std::collections::VecDeque;

use petgraph::stable_graph::NodeIndex;
use serde::Serialize;
use synapse_protocol::CausalEdge;

use crate::graph::IndexedGraph;

/// One path `from -> ... -> to`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CausalChain {
    /// Memory ids along the path, endpoints included.
    pub memory_ids: Vec<String>,
    pub edges: Vec<CausalEdge>,
    /// Sum of edge uplifts.
    pub combined_uplift: f64,
    /// Weakest link.
    pub min_confidence: f64,
}

impl CausalChain {
    pub fn hops(&self) -> usize {
        self.edges.len()
    }

    fn from_path(graph: &IndexedGraph, nodes: &[NodeIndex], edges: &[&CausalEdge]) -> Self {
        Self {
            memory_ids: nodes
                .iter()
                .filter_map(|&idx| graph.memory_id(idx).map(str::to_string))
                .collect(),
            edges: edges.iter().map(|&e| e.clone()).collect(),
            combined_uplift: edges.iter().map(|e| e.uplift).sum(),
            min_confidence: edges.iter().map(|e| e.confidence).fold(1.0, f64::min),
        }
    }
}

struct Partial<'g> {
    nodes: Vec<NodeIndex>,
    edges: Vec<&'g CausalEdge>,
}

/// Every path from `from_id` to `to_id` of at most `max_depth` edges that
/// never visits a memory twice. Shorter chains come first, then higher
/// combined uplift.
pub fn find_chains(graph: &IndexedGraph, from_id: &str, to_id: &str, max_depth: usize) -> Vec<CausalChain> {
    let (Some(start), Some(goal)) = (graph.get_node(from_id), graph.get_node(to_id)) else {
        return Vec::new();
    };
    if start == goal || max_depth == 0 {
        return Vec::new();
    }

    let mut chains = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(Partial {
        nodes: vec![start],
        edges: Vec::new(),
    });

    while let Some(path) = queue.pop_front() {
        let Some(&tail) = path.nodes.last() else {
            continue;
        };
        for (next, _, edge) in graph.outgoing(tail) {
            // Cycle guard.
            if path.nodes.contains(&next) {
                continue;
            }
            let mut nodes = path.nodes.clone();
            nodes.push(next);
            let mut edges = path.edges.clone();
            edges.push(edge);

            if next == goal {
                chains.push(CausalChain::from_path(graph, &nodes, &edges));
            } else if edges.len() < max_depth {
                queue.push_back(Partial { nodes, edges });
            }
        }
    }

    chains.sort_by(|a, b| {
        a.hops()
            .cmp(&b.hops())
            .then_with(|| b.combined_uplift.total_cmp(&a.combined_uplift))
            .then_with(|| a.memory_ids.cmp(&b.memory_ids))
    });
    chains
}
