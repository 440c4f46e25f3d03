//! Single write connection behind `tokio::sync::Mutex`.

use std::path::Path;

use rusqlite::Connection;
use synapse_core::errors::SynapseResult;
use tokio::sync::Mutex;

use super::pragmas::apply_pragmas;
use crate::to_storage_err;

/// A single write connection protected by an async mutex.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    pub fn open(path: &Path) -> SynapseResult<Self> {
        let conn = Connection::open(path).map_err(|e| to_storage_err(e.to_string()))?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> SynapseResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| to_storage_err(e.to_string()))?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the write lock and execute a closure with the connection.
    pub async fn with_conn<F, T>(&self, f: F) -> SynapseResult<T>
    where
        F: FnOnce(&Connection) -> SynapseResult<T>,
    {
        let guard = self.conn.lock().await;
        f(&guard)
    }

    /// Like [`with_conn`](Self::with_conn), wrapped in a transaction that
    /// commits only if the closure succeeds.
    pub async fn with_transaction<F, T>(&self, f: F) -> SynapseResult<T>
    where
        F: FnOnce(&Connection) -> SynapseResult<T>,
    {
        let guard = self.conn.lock().await;
        let tx = guard
            .unchecked_transaction()
            .map_err(|e| to_storage_err(e.to_string()))?;
        let value = f(&tx)?;
        tx.commit().map_err(|e| to_storage_err(e.to_string()))?;
        Ok(value)
    }

    /// Exclusive access before the connection is shared (startup migrations).
    pub fn with_conn_mut<F, T>(&mut self, f: F) -> SynapseResult<T>
    where
        F: FnOnce(&Connection) -> SynapseResult<T>,
    {
        f(self.conn.get_mut())
    }
}
