//! In-memory view of the stored causal edges, indexed by memory id.

pub mod pruning;

use std::collections::HashMap;

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use synapse_protocol::CausalEdge;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryNode {
    pub memory_id: String,
    pub memory_type: String,
}

/// Directed graph of memories with at most one edge per `(from, to)` pair.
#[derive(Debug, Default)]
pub struct IndexedGraph {
    pub graph: StableGraph<MemoryNode, CausalEdge>,
    index: HashMap<String, NodeIndex>,
}

impl IndexedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = CausalEdge>,
    {
        let mut graph = Self::new();
        for edge in edges {
            graph.upsert_edge(edge);
        }
        graph
    }

    pub fn ensure_node(&mut self, memory_id: &str, memory_type: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(memory_id) {
            return idx;
        }
        let idx = self.graph.add_node(MemoryNode {
            memory_id: memory_id.to_string(),
            memory_type: memory_type.to_string(),
        });
        self.index.insert(memory_id.to_string(), idx);
        idx
    }

    pub fn get_node(&self, memory_id: &str) -> Option<NodeIndex> {
        self.index.get(memory_id).copied()
    }

    /// Insert the edge, replacing any edge already stored for its key.
    pub fn upsert_edge(&mut self, edge: CausalEdge) -> EdgeIndex {
        let from = self.ensure_node(&edge.from_memory_id, &edge.from_memory_type);
        let to = self.ensure_node(&edge.to_memory_id, &edge.to_memory_type);
        match self.graph.find_edge(from, to) {
            Some(existing) => {
                if let Some(weight) = self.graph.edge_weight_mut(existing) {
                    *weight = edge;
                }
                existing
            }
            None => self.graph.add_edge(from, to, edge),
        }
    }

    pub fn edge(&self, from_id: &str, to_id: &str) -> Option<&CausalEdge> {
        let from = self.get_node(from_id)?;
        let to = self.get_node(to_id)?;
        self.graph
            .find_edge(from, to)
            .and_then(|idx| self.graph.edge_weight(idx))
    }

    /// Outgoing edges of a node with their target index.
    pub fn outgoing(&self, idx: NodeIndex) -> impl Iterator<Item = (NodeIndex, EdgeIndex, &CausalEdge)> {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.id(), e.weight()))
    }

    pub fn memory_id(&self, idx: NodeIndex) -> Option<&str> {
        self.graph.node_weight(idx).map(|n| n.memory_id.as_str())
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
