//! Hub-side tables. Every statement is scoped by `tenant_id` even though each
//! tenant already has its own database file.

use rusqlite::{params, Connection, OptionalExtension};
use synapse_core::errors::SynapseResult;
use synapse_crdt::VectorClock;
use synapse_protocol::SyncMessage;

use crate::{corrupt, to_storage_err};

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeLogRow {
    pub tenant_id: String,
    pub agent_id: String,
    pub operation: String,
    pub episode_id: String,
    pub vector_clock: VectorClock,
    pub created_at_ms: i64,
}

/// A stored record with its hub-assigned position.
#[derive(Debug, Clone)]
pub struct HubRecordRow {
    pub id: i64,
    pub message: SyncMessage,
}

/// Insert unless `(tenant, origin, sequence)` already exists. Returns
/// whether a row was written.
pub fn insert_record(conn: &Connection, tenant_id: &str, message: &SyncMessage, now_ms: i64) -> SynapseResult<bool> {
    let written = conn
        .execute(
            "INSERT OR IGNORE INTO hub_records
                (tenant_id, origin_node, sequence_number, record_id, kind, message_json, vector_clock, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                tenant_id,
                message.node_id,
                message.sequence_number as i64,
                message.record_id(),
                message.kind().as_str(),
                serde_json::to_string(message)?,
                serde_json::to_string(&message.vector_clock)?,
                now_ms,
            ],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(written > 0)
}

pub fn append_change(conn: &Connection, row: &ChangeLogRow) -> SynapseResult<()> {
    conn.execute(
        "INSERT INTO change_log (tenant_id, agent_id, operation, episode_id, vector_clock, created_at_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            row.tenant_id,
            row.agent_id,
            row.operation,
            row.episode_id,
            serde_json::to_string(&row.vector_clock)?,
            row.created_at_ms,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Records in insertion order.
pub fn records_for_tenant(conn: &Connection, tenant_id: &str) -> SynapseResult<Vec<HubRecordRow>> {
    let mut stmt = conn
        .prepare("SELECT id, message_json FROM hub_records WHERE tenant_id = ?1 ORDER BY id")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![tenant_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter()
        .map(|(id, json)| {
            let message = serde_json::from_str(&json).map_err(|e| corrupt("hub_records.message_json", e))?;
            Ok(HubRecordRow { id, message })
        })
        .collect()
}

/// Up to `limit` records with row id above `after_id`, in insertion order.
/// Served by the `(tenant_id, id)` index.
pub fn records_after(conn: &Connection, tenant_id: &str, after_id: i64, limit: usize) -> SynapseResult<Vec<HubRecordRow>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, message_json FROM hub_records
             WHERE tenant_id = ?1 AND id > ?2 ORDER BY id LIMIT ?3",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt
        .query_map(params![tenant_id, after_id, limit], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter()
        .map(|(id, json)| {
            let message = serde_json::from_str(&json).map_err(|e| corrupt("hub_records.message_json", e))?;
            Ok(HubRecordRow { id, message })
        })
        .collect()
}

pub fn change_log_for_tenant(conn: &Connection, tenant_id: &str) -> SynapseResult<Vec<ChangeLogRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT tenant_id, agent_id, operation, episode_id, vector_clock, created_at_ms
             FROM change_log WHERE tenant_id = ?1 ORDER BY id",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![tenant_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter()
        .map(|(tenant_id, agent_id, operation, episode_id, clock, created_at_ms)| {
            Ok(ChangeLogRow {
                tenant_id,
                agent_id,
                operation,
                episode_id,
                vector_clock: serde_json::from_str(&clock).map_err(|e| corrupt("change_log.vector_clock", e))?,
                created_at_ms,
            })
        })
        .collect()
}

pub fn load_tenant_clock(conn: &Connection, tenant_id: &str) -> SynapseResult<VectorClock> {
    let clock: Option<String> = conn
        .query_row(
            "SELECT vector_clock FROM tenant_clock WHERE tenant_id = ?1",
            params![tenant_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    match clock {
        Some(s) => serde_json::from_str(&s).map_err(|e| corrupt("tenant_clock.vector_clock", e)),
        None => Ok(VectorClock::new()),
    }
}

pub fn save_tenant_clock(conn: &Connection, tenant_id: &str, clock: &VectorClock, now_ms: i64) -> SynapseResult<()> {
    conn.execute(
        "INSERT INTO tenant_clock (tenant_id, vector_clock, updated_at_ms) VALUES (?1, ?2, ?3)
         ON CONFLICT(tenant_id) DO UPDATE SET vector_clock = ?2, updated_at_ms = ?3",
        params![tenant_id, serde_json::to_string(clock)?, now_ms],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
