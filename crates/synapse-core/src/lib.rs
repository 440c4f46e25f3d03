//! # synapse-core
//!
//! Foundation crate for the Synapse federated memory engine.
//! Defines the error taxonomy, configuration, shared models, collaborator
//! traits, and constants. Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::SynapseConfig;
pub use errors::{SynapseError, SynapseResult};
pub use models::{now_ms, AgentIdentity};
