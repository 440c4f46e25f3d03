//! # synapse-causal
//!
//! Causal memory graph for one agent: evidenced edges between memories,
//! treatment/control experiments that estimate uplift, ranked effect
//! queries, bounded intervention-chain search and maintenance pruning.
//! Everything is persisted through the agent's [`synapse_storage::AgentStore`].

pub mod engine;
pub mod experiment;
pub mod graph;
pub mod query;
pub mod traversal;
pub mod uplift;

pub use engine::{CausalMemoryGraph, ExperimentOutcome};
pub use experiment::{Experiment, ExperimentSpec, ExperimentStatus, Observation};
pub use graph::pruning::PruneResult;
pub use graph::IndexedGraph;
pub use query::EffectFilter;
pub use traversal::CausalChain;
pub use uplift::UpliftEstimate;
