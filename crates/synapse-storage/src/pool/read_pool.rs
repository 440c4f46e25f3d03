//! Read-only connections for file-backed databases, handed out round-robin.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};
use synapse_core::errors::SynapseResult;

use super::pragmas::apply_read_pragmas;
use crate::to_storage_err;

const MAX_READERS: usize = 8;

pub struct ReadPool {
    readers: Vec<Mutex<Connection>>,
    cursor: AtomicUsize,
}

impl ReadPool {
    /// `size` is clamped to `1..=8`.
    pub fn open(path: &Path, size: usize) -> SynapseResult<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let readers = (0..size.clamp(1, MAX_READERS))
            .map(|_| {
                let conn = Connection::open_with_flags(path, flags).map_err(|e| to_storage_err(e.to_string()))?;
                apply_read_pragmas(&conn)?;
                Ok(Mutex::new(conn))
            })
            .collect::<SynapseResult<Vec<_>>>()?;
        Ok(Self {
            readers,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> SynapseResult<T>
    where
        F: FnOnce(&Connection) -> SynapseResult<T>,
    {
        let slot = self.cursor.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self
            .readers
            .get(slot)
            .ok_or_else(|| to_storage_err(format!("no reader in slot {slot}")))?
            .lock()
            .map_err(|_| to_storage_err("reader mutex poisoned".to_string()))?;
        f(&conn)
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }
}
