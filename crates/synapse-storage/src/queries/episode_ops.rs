use rusqlite::{params, Connection, OptionalExtension};
use synapse_core::errors::SynapseResult;
use synapse_protocol::EpisodeRecord;
use tracing::debug;

use crate::{corrupt, to_storage_err};

/// Insert or replace the stored state of an episode.
pub fn upsert_episode(conn: &Connection, episode: &EpisodeRecord) -> SynapseResult<()> {
    debug!(episode_id = %episode.id, "upserting episode");
    let state = serde_json::to_string(episode)?;
    let updated_at = episode.content.timestamp().max(episode.deleted.timestamp());
    conn.execute(
        "INSERT INTO episodes (id, state_json, deleted, updated_at_ms) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET state_json = ?2, deleted = ?3, updated_at_ms = ?4",
        params![episode.id, state, episode.is_deleted(), updated_at],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_episode(conn: &Connection, id: &str) -> SynapseResult<Option<EpisodeRecord>> {
    let state: Option<String> = conn
        .query_row(
            "SELECT state_json FROM episodes WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    state
        .map(|s| serde_json::from_str(&s).map_err(|e| corrupt("episodes.state_json", e)))
        .transpose()
}

/// All episodes ordered by id. Tombstoned ones only when asked.
pub fn list_episodes(conn: &Connection, include_deleted: bool) -> SynapseResult<Vec<EpisodeRecord>> {
    let sql = if include_deleted {
        "SELECT state_json FROM episodes ORDER BY id"
    } else {
        "SELECT state_json FROM episodes WHERE deleted = 0 ORDER BY id"
    };
    let mut stmt = conn.prepare(sql).map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.iter()
        .map(|s| serde_json::from_str(s).map_err(|e| corrupt("episodes.state_json", e)))
        .collect()
}
