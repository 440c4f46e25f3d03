//! Connection pool managing read/write connections.

pub mod pragmas;
pub mod read_pool;
pub mod write_connection;

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use synapse_core::errors::SynapseResult;

pub use read_pool::ReadPool;
pub use write_connection::WriteConnection;

/// The single write connection plus, for file-backed databases, a read pool.
pub struct ConnectionPool {
    pub writer: WriteConnection,
    pub readers: Option<ReadPool>,
    pub db_path: Option<PathBuf>,
}

impl ConnectionPool {
    /// Open the writer, run `init` on it (migrations), then open readers.
    pub fn open<F>(path: &Path, read_pool_size: usize, init: F) -> SynapseResult<Self>
    where
        F: FnOnce(&Connection) -> SynapseResult<()>,
    {
        let mut writer = WriteConnection::open(path)?;
        writer.with_conn_mut(init)?;
        let readers = ReadPool::open(path, read_pool_size)?;
        Ok(Self {
            writer,
            readers: Some(readers),
            db_path: Some(path.to_path_buf()),
        })
    }

    /// In-memory pool. Readers would see separate databases, so all reads go
    /// through the writer.
    pub fn open_in_memory<F>(init: F) -> SynapseResult<Self>
    where
        F: FnOnce(&Connection) -> SynapseResult<()>,
    {
        let mut writer = WriteConnection::open_in_memory()?;
        writer.with_conn_mut(init)?;
        Ok(Self {
            writer,
            readers: None,
            db_path: None,
        })
    }

    /// Run a read-only closure on the best available connection.
    pub async fn with_reader<F, T>(&self, f: F) -> SynapseResult<T>
    where
        F: FnOnce(&Connection) -> SynapseResult<T>,
    {
        match &self.readers {
            Some(readers) => readers.with_conn(f),
            None => self.writer.with_conn(f).await,
        }
    }
}
