//! # synapse-storage
//!
//! SQLite persistence. [`AgentStore`] holds one agent's episodes, skills,
//! change log, sync state, causal graph and certificates. [`HubStore`] holds
//! one database per tenant so tenants never contend on a shared lock.

pub mod agent_store;
pub mod hub_store;
pub mod migrations;
pub mod pool;
pub mod queries;

pub use agent_store::AgentStore;
pub use hub_store::{ChangePage, HubStore, PersistOutcome, TenantStore};

use synapse_core::errors::{StorageError, SynapseError};

/// Wrap a driver message into the workspace error type.
pub fn to_storage_err(message: String) -> SynapseError {
    StorageError::SqliteError { message }.into()
}

/// Stored JSON that no longer parses is corruption, not a serialization bug.
pub(crate) fn corrupt(what: &str, e: serde_json::Error) -> SynapseError {
    StorageError::CorruptRow {
        details: format!("{what}: {e}"),
    }
    .into()
}
