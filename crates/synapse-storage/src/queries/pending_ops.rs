//! The agent's local change log. Rows stay `pending` until the hub acks them,
//! so a retried push resends the exact sequence number and clock.

use rusqlite::{params, Connection};
use synapse_core::errors::SynapseResult;
use synapse_protocol::SyncMessage;
use tracing::debug;

use crate::{corrupt, to_storage_err};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ACKED: &str = "acked";
pub const STATUS_REJECTED: &str = "rejected";

/// A change the hub refused for good.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedChange {
    pub sequence_number: u64,
    pub record_id: String,
    pub reason: String,
}

pub fn insert_pending(conn: &Connection, message: &SyncMessage) -> SynapseResult<()> {
    debug!(seq = message.sequence_number, kind = message.kind().as_str(), "appending change");
    let json = serde_json::to_string(message)?;
    conn.execute(
        "INSERT INTO pending_changes (sequence_number, record_id, kind, operation, message_json, created_at_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            message.sequence_number as i64,
            message.record_id(),
            message.kind().as_str(),
            message.operation(),
            json,
            message.timestamp_ms,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Oldest pending changes first.
pub fn pending_batch(conn: &Connection, limit: usize) -> SynapseResult<Vec<SyncMessage>> {
    let mut stmt = conn
        .prepare(
            "SELECT message_json FROM pending_changes WHERE status = ?1
             ORDER BY sequence_number LIMIT ?2",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![STATUS_PENDING, limit as i64], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.iter()
        .map(|s| serde_json::from_str(s).map_err(|e| corrupt("pending_changes.message_json", e)))
        .collect()
}

pub fn mark_acked(conn: &Connection, sequence_numbers: &[u64], now_ms: i64) -> SynapseResult<usize> {
    let mut stmt = conn
        .prepare(
            "UPDATE pending_changes SET status = ?1, acked_at_ms = ?2, last_error = NULL
             WHERE sequence_number = ?3 AND status = ?4",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut updated = 0;
    for &seq in sequence_numbers {
        updated += stmt
            .execute(params![STATUS_ACKED, now_ms, seq as i64, STATUS_PENDING])
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(updated)
}

pub fn mark_rejected(conn: &Connection, sequence_number: u64, reason: &str) -> SynapseResult<()> {
    conn.execute(
        "UPDATE pending_changes SET status = ?1, last_error = ?2 WHERE sequence_number = ?3",
        params![STATUS_REJECTED, reason, sequence_number as i64],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Count a failed delivery attempt without changing status.
pub fn record_attempt(conn: &Connection, sequence_numbers: &[u64], error: &str) -> SynapseResult<()> {
    let mut stmt = conn
        .prepare(
            "UPDATE pending_changes SET attempts = attempts + 1, last_error = ?1
             WHERE sequence_number = ?2 AND status = ?3",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    for &seq in sequence_numbers {
        stmt.execute(params![error, seq as i64, STATUS_PENDING])
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(())
}

pub fn pending_count(conn: &Connection) -> SynapseResult<u64> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pending_changes WHERE status = ?1",
            params![STATUS_PENDING],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as u64)
}

pub fn attempts(conn: &Connection, sequence_number: u64) -> SynapseResult<u32> {
    let attempts: i64 = conn
        .query_row(
            "SELECT attempts FROM pending_changes WHERE sequence_number = ?1",
            params![sequence_number as i64],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(attempts as u32)
}

pub fn rejected_changes(conn: &Connection) -> SynapseResult<Vec<RejectedChange>> {
    let mut stmt = conn
        .prepare(
            "SELECT sequence_number, record_id, COALESCE(last_error, '') FROM pending_changes
             WHERE status = ?1 ORDER BY sequence_number",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![STATUS_REJECTED], |row| {
            Ok(RejectedChange {
                sequence_number: row.get::<_, i64>(0)? as u64,
                record_id: row.get(1)?,
                reason: row.get(2)?,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows)
}
