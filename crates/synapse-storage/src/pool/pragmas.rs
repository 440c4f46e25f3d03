//! Connection pragmas. Writers get WAL with NORMAL sync; readers are pinned to
//! `query_only` so a stray write through the read pool fails loudly.

use std::time::Duration;

use rusqlite::Connection;
use synapse_core::errors::SynapseResult;

use crate::to_storage_err;

/// Milliseconds a connection waits on a locked database before `SQLITE_BUSY`.
pub const BUSY_TIMEOUT_MS: u64 = 5_000;

const WRITER: &[(&str, &str)] = &[
    ("journal_mode", "WAL"),
    ("synchronous", "NORMAL"),
    ("cache_size", "-64000"),
    ("foreign_keys", "ON"),
];

const READER: &[(&str, &str)] = &[("cache_size", "-16000"), ("query_only", "ON")];

fn apply(conn: &Connection, pragmas: &[(&str, &str)]) -> SynapseResult<()> {
    conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
        .map_err(|e| to_storage_err(e.to_string()))?;
    for (name, value) in pragmas {
        conn.pragma_update(None, name, value)
            .map_err(|e| to_storage_err(format!("PRAGMA {name}: {e}")))?;
    }
    Ok(())
}

pub fn apply_pragmas(conn: &Connection) -> SynapseResult<()> {
    apply(conn, WRITER)
}

pub fn apply_read_pragmas(conn: &Connection) -> SynapseResult<()> {
    apply(conn, READER)
}

/// The connection's current journal mode, lowercased (`wal`, `memory`, ...).
pub fn journal_mode(conn: &Connection) -> SynapseResult<String> {
    conn.pragma_query_value(None, "journal_mode", |row| row.get::<_, String>(0))
        .map(|mode| mode.to_lowercase())
        .map_err(|e| to_storage_err(e.to_string()))
}
