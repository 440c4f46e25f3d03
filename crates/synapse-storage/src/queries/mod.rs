//! Raw SQL operations. No business logic, just persistence.

pub mod causal_edge_ops;
pub mod certificate_ops;
pub mod episode_ops;
pub mod experiment_ops;
pub mod hub_ops;
pub mod pending_ops;
pub mod skill_ops;
pub mod sync_state_ops;
