use rusqlite::{params, Connection, OptionalExtension, Row};
use synapse_core::errors::SynapseResult;
use synapse_protocol::CausalEdge;
use tracing::debug;

use crate::{corrupt, to_storage_err};

const EDGE_COLUMNS: &str = "edge_id, from_memory_id, from_memory_type, to_memory_id, to_memory_type,
    similarity, uplift, confidence, sample_size, evidence_ids, confounder_score, mechanism,
    version, last_modified_by, created_at_ms, updated_at_ms, estimates";

/// Row as stored; JSON columns are decoded after the statement finishes.
struct RawEdge {
    edge: CausalEdge,
    evidence_ids: String,
    version: String,
    estimates: String,
}

fn raw_edge(row: &Row<'_>) -> rusqlite::Result<RawEdge> {
    Ok(RawEdge {
        edge: CausalEdge {
            edge_id: row.get(0)?,
            from_memory_id: row.get(1)?,
            from_memory_type: row.get(2)?,
            to_memory_id: row.get(3)?,
            to_memory_type: row.get(4)?,
            similarity: row.get(5)?,
            uplift: row.get(6)?,
            confidence: row.get(7)?,
            sample_size: row.get::<_, i64>(8)? as u64,
            estimates: Default::default(),
            evidence_ids: Vec::new(),
            confounder_score: row.get(10)?,
            mechanism: row.get(11)?,
            version: Default::default(),
            last_modified_by: row.get(13)?,
            created_at_ms: row.get(14)?,
            updated_at_ms: row.get(15)?,
        },
        evidence_ids: row.get(9)?,
        version: row.get(12)?,
        estimates: row.get(16)?,
    })
}

fn decode(raw: RawEdge) -> SynapseResult<CausalEdge> {
    let mut edge = raw.edge;
    edge.evidence_ids =
        serde_json::from_str(&raw.evidence_ids).map_err(|e| corrupt("causal_edges.evidence_ids", e))?;
    edge.version = serde_json::from_str(&raw.version).map_err(|e| corrupt("causal_edges.version", e))?;
    edge.estimates =
        serde_json::from_str(&raw.estimates).map_err(|e| corrupt("causal_edges.estimates", e))?;
    Ok(edge)
}

fn query_edges(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> SynapseResult<Vec<CausalEdge>> {
    let mut stmt = conn.prepare(sql).map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params, raw_edge)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().map(decode).collect()
}

/// Insert or replace the edge for its (from, to) pair. Callers carry the
/// stored identity forward (`CausalEdge::superseding`, `merge_concurrent`).
pub fn upsert_edge(conn: &Connection, edge: &CausalEdge) -> SynapseResult<()> {
    debug!(from = %edge.from_memory_id, to = %edge.to_memory_id, uplift = edge.uplift, "upserting causal edge");
    conn.execute(
        &format!(
            "INSERT INTO causal_edges ({EDGE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
             ON CONFLICT(from_memory_id, to_memory_id) DO UPDATE SET
                edge_id = ?1, created_at_ms = ?15, from_memory_type = ?3, to_memory_type = ?5, similarity = ?6, uplift = ?7,
                confidence = ?8, sample_size = ?9, evidence_ids = ?10, confounder_score = ?11,
                mechanism = ?12, version = ?13, last_modified_by = ?14, updated_at_ms = ?16,
                estimates = ?17"
        ),
        params![
            edge.edge_id,
            edge.from_memory_id,
            edge.from_memory_type,
            edge.to_memory_id,
            edge.to_memory_type,
            edge.similarity,
            edge.uplift,
            edge.confidence,
            edge.sample_size as i64,
            serde_json::to_string(&edge.evidence_ids)?,
            edge.confounder_score,
            edge.mechanism,
            serde_json::to_string(&edge.version)?,
            edge.last_modified_by,
            edge.created_at_ms,
            edge.updated_at_ms,
            serde_json::to_string(&edge.estimates)?,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_edge(conn: &Connection, from_id: &str, to_id: &str) -> SynapseResult<Option<CausalEdge>> {
    let raw = conn
        .query_row(
            &format!("SELECT {EDGE_COLUMNS} FROM causal_edges WHERE from_memory_id = ?1 AND to_memory_id = ?2"),
            params![from_id, to_id],
            raw_edge,
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    raw.map(decode).transpose()
}

pub fn list_edges(conn: &Connection) -> SynapseResult<Vec<CausalEdge>> {
    query_edges(
        conn,
        &format!("SELECT {EDGE_COLUMNS} FROM causal_edges ORDER BY from_memory_id, to_memory_id"),
        [],
    )
}

pub fn edges_from(conn: &Connection, from_id: &str) -> SynapseResult<Vec<CausalEdge>> {
    query_edges(
        conn,
        &format!("SELECT {EDGE_COLUMNS} FROM causal_edges WHERE from_memory_id = ?1 ORDER BY to_memory_id"),
        params![from_id],
    )
}

pub fn delete_edge(conn: &Connection, from_id: &str, to_id: &str) -> SynapseResult<bool> {
    let deleted = conn
        .execute(
            "DELETE FROM causal_edges WHERE from_memory_id = ?1 AND to_memory_id = ?2",
            params![from_id, to_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(deleted > 0)
}

/// Delete weak edges untouched since `older_than_ms`. Returns the count removed.
pub fn prune_edges(
    conn: &Connection,
    min_confidence: f64,
    min_sample_size: u64,
    older_than_ms: i64,
) -> SynapseResult<usize> {
    conn.execute(
        "DELETE FROM causal_edges
         WHERE (confidence < ?1 OR sample_size < ?2) AND updated_at_ms < ?3",
        params![min_confidence, min_sample_size as i64, older_than_ms],
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

pub fn edge_count(conn: &Connection) -> SynapseResult<u64> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM causal_edges", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as u64)
}
