use rusqlite::{params, Connection, OptionalExtension};
use synapse_core::errors::SynapseResult;
use synapse_crdt::VectorClock;
use tracing::debug;

use crate::{corrupt, to_storage_err};

#[derive(Debug, Clone)]
pub struct SyncStateRow {
    pub node_id: String,
    pub vector_clock: VectorClock,
    pub next_sequence: u64,
    pub last_sync_at_ms: Option<i64>,
}

/// Create the singleton row for `node_id` if absent.
pub fn init_sync_state(conn: &Connection, node_id: &str) -> SynapseResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO sync_state (id, node_id) VALUES (1, ?1)",
        params![node_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn load_sync_state(conn: &Connection) -> SynapseResult<Option<SyncStateRow>> {
    let row: Option<(String, String, i64, Option<i64>)> = conn
        .query_row(
            "SELECT node_id, vector_clock, next_sequence, last_sync_at_ms FROM sync_state WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    row.map(|(node_id, clock, next_sequence, last_sync_at_ms)| {
        Ok(SyncStateRow {
            node_id,
            vector_clock: serde_json::from_str(&clock)
                .map_err(|e| corrupt("sync_state.vector_clock", e))?,
            next_sequence: next_sequence as u64,
            last_sync_at_ms,
        })
    })
    .transpose()
}

pub fn save_clock(conn: &Connection, clock: &VectorClock) -> SynapseResult<()> {
    debug!(clock = %clock, "saving local clock");
    conn.execute(
        "UPDATE sync_state SET vector_clock = ?1 WHERE id = 1",
        params![serde_json::to_string(clock)?],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Reserve the next local sequence number.
pub fn allocate_sequence(conn: &Connection) -> SynapseResult<u64> {
    let seq: i64 = conn
        .query_row(
            "UPDATE sync_state SET next_sequence = next_sequence + 1 WHERE id = 1
             RETURNING next_sequence - 1",
            [],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(seq as u64)
}

pub fn mark_synced(conn: &Connection, now_ms: i64) -> SynapseResult<()> {
    conn.execute(
        "UPDATE sync_state SET last_sync_at_ms = ?1 WHERE id = 1",
        params![now_ms],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
