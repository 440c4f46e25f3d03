use rusqlite::{params, Connection, OptionalExtension};
use synapse_core::errors::SynapseResult;
use tracing::debug;

use crate::{corrupt, to_storage_err};

#[derive(Debug, Clone, PartialEq)]
pub struct CertificateRow {
    pub id: String,
    pub query_id: String,
    pub query_text: String,
    pub requirements: Vec<String>,
    pub minimal_why: Vec<String>,
    pub unsatisfied: Vec<String>,
    pub merkle_root: String,
    pub access_level: String,
    pub chunk_count: u32,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRow {
    pub position: u32,
    pub chunk_id: String,
    pub chunk_type: String,
    pub content: String,
    pub relevance: f64,
    pub tags: Vec<String>,
}

/// Write a certificate and its ordered chunks. Callers wrap this in a transaction.
pub fn insert_certificate(conn: &Connection, cert: &CertificateRow, chunks: &[ChunkRow]) -> SynapseResult<()> {
    debug!(certificate_id = %cert.id, chunks = chunks.len(), "storing certificate");
    conn.execute(
        "INSERT INTO recall_certificates
            (id, query_id, query_text, requirements, minimal_why, unsatisfied, merkle_root,
             access_level, chunk_count, created_at_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            cert.id,
            cert.query_id,
            cert.query_text,
            serde_json::to_string(&cert.requirements)?,
            serde_json::to_string(&cert.minimal_why)?,
            serde_json::to_string(&cert.unsatisfied)?,
            cert.merkle_root,
            cert.access_level,
            cert.chunk_count,
            cert.created_at_ms,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    let mut stmt = conn
        .prepare(
            "INSERT INTO certificate_chunks
                (certificate_id, position, chunk_id, chunk_type, content, relevance, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    for chunk in chunks {
        stmt.execute(params![
            cert.id,
            chunk.position,
            chunk.chunk_id,
            chunk.chunk_type,
            chunk.content,
            chunk.relevance,
            serde_json::to_string(&chunk.tags)?,
        ])
        .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(())
}

pub fn get_certificate(conn: &Connection, id: &str) -> SynapseResult<Option<CertificateRow>> {
    let raw: Option<(CertificateRow, [String; 3])> = conn
        .query_row(
            "SELECT id, query_id, query_text, requirements, minimal_why, unsatisfied, merkle_root,
                    access_level, chunk_count, created_at_ms
             FROM recall_certificates WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    CertificateRow {
                        id: row.get(0)?,
                        query_id: row.get(1)?,
                        query_text: row.get(2)?,
                        requirements: Vec::new(),
                        minimal_why: Vec::new(),
                        unsatisfied: Vec::new(),
                        merkle_root: row.get(6)?,
                        access_level: row.get(7)?,
                        chunk_count: row.get(8)?,
                        created_at_ms: row.get(9)?,
                    },
                    [row.get(3)?, row.get(4)?, row.get(5)?],
                ))
            },
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let Some((mut cert, [requirements, minimal_why, unsatisfied])) = raw else {
        return Ok(None);
    };
    cert.requirements =
        serde_json::from_str(&requirements).map_err(|e| corrupt("recall_certificates.requirements", e))?;
    cert.minimal_why =
        serde_json::from_str(&minimal_why).map_err(|e| corrupt("recall_certificates.minimal_why", e))?;
    cert.unsatisfied =
        serde_json::from_str(&unsatisfied).map_err(|e| corrupt("recall_certificates.unsatisfied", e))?;
    Ok(Some(cert))
}

/// Chunks in leaf order.
pub fn get_chunks(conn: &Connection, certificate_id: &str) -> SynapseResult<Vec<ChunkRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT position, chunk_id, chunk_type, content, relevance, tags
             FROM certificate_chunks WHERE certificate_id = ?1 ORDER BY position",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![certificate_id], |row| {
            Ok((
                ChunkRow {
                    position: row.get(0)?,
                    chunk_id: row.get(1)?,
                    chunk_type: row.get(2)?,
                    content: row.get(3)?,
                    relevance: row.get(4)?,
                    tags: Vec::new(),
                },
                row.get::<_, String>(5)?,
            ))
        })
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter()
        .map(|(mut chunk, tags)| {
            chunk.tags = serde_json::from_str(&tags).map_err(|e| corrupt("certificate_chunks.tags", e))?;
            Ok(chunk)
        })
        .collect()
}

/// Overwrite a stored chunk's content. Only integrity tooling should need this.
pub fn update_chunk_content(
    conn: &Connection,
    certificate_id: &str,
    chunk_id: &str,
    content: &str,
) -> SynapseResult<bool> {
    let updated = conn
        .execute(
            "UPDATE certificate_chunks SET content = ?1 WHERE certificate_id = ?2 AND chunk_id = ?3",
            params![content, certificate_id, chunk_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(updated > 0)
}
