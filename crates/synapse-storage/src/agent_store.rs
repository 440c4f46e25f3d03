//! One agent's local database.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use synapse_core::config::StorageConfig;
use synapse_core::errors::SynapseResult;
use tracing::info;

use crate::migrations::run_agent_migrations;
use crate::pool::ConnectionPool;

/// Episodes, skills, the pending change log, sync state, the causal graph and
/// recall certificates for a single agent.
pub struct AgentStore {
    pool: ConnectionPool,
}

impl AgentStore {
    /// Open (or create) a file-backed store and migrate it.
    pub fn open(path: &Path, read_pool_size: usize) -> SynapseResult<Self> {
        let pool = ConnectionPool::open(path, read_pool_size, run_agent_migrations)?;
        info!(path = %path.display(), "opened agent store");
        Ok(Self { pool })
    }

    /// Open from config. No `db_path` means an in-memory database.
    pub fn from_config(config: &StorageConfig) -> SynapseResult<Self> {
        match &config.db_path {
            Some(path) => Self::open(Path::new(path), config.read_pool_size),
            None => Self::open_in_memory(),
        }
    }

    pub fn open_in_memory() -> SynapseResult<Self> {
        let pool = ConnectionPool::open_in_memory(run_agent_migrations)?;
        Ok(Self { pool })
    }

    pub fn db_path(&self) -> Option<&PathBuf> {
        self.pool.db_path.as_ref()
    }

    /// Zero for in-memory stores, whose reads share the writer.
    pub fn reader_count(&self) -> usize {
        self.pool.readers.as_ref().map_or(0, |r| r.len())
    }

    /// Run `f` on the write connection.
    pub async fn with_writer<F, T>(&self, f: F) -> SynapseResult<T>
    where
        F: FnOnce(&Connection) -> SynapseResult<T>,
    {
        self.pool.writer.with_conn(f).await
    }

    /// Run `f` on the write connection inside a transaction.
    pub async fn with_transaction<F, T>(&self, f: F) -> SynapseResult<T>
    where
        F: FnOnce(&Connection) -> SynapseResult<T>,
    {
        self.pool.writer.with_transaction(f).await
    }

    pub async fn with_reader<F, T>(&self, f: F) -> SynapseResult<T>
    where
        F: FnOnce(&Connection) -> SynapseResult<T>,
    {
        self.pool.with_reader(f).await
    }
}
