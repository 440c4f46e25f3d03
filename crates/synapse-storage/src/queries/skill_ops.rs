use rusqlite::{params, Connection, OptionalExtension};
use synapse_core::errors::SynapseResult;
use synapse_protocol::SkillRecord;
use tracing::debug;

use crate::{corrupt, to_storage_err};

pub fn upsert_skill(conn: &Connection, skill: &SkillRecord, now_ms: i64) -> SynapseResult<()> {
    debug!(skill_id = %skill.skill_id, usage = skill.usage_count(), "upserting skill");
    let state = serde_json::to_string(skill)?;
    conn.execute(
        "INSERT INTO skills (id, state_json, updated_at_ms) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET state_json = ?2, updated_at_ms = ?3",
        params![skill.skill_id, state, now_ms],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_skill(conn: &Connection, skill_id: &str) -> SynapseResult<Option<SkillRecord>> {
    let state: Option<String> = conn
        .query_row(
            "SELECT state_json FROM skills WHERE id = ?1",
            params![skill_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    state
        .map(|s| serde_json::from_str(&s).map_err(|e| corrupt("skills.state_json", e)))
        .transpose()
}

pub fn list_skills(conn: &Connection) -> SynapseResult<Vec<SkillRecord>> {
    let mut stmt = conn
        .prepare("SELECT state_json FROM skills ORDER BY id")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.iter()
        .map(|s| serde_json::from_str(s).map_err(|e| corrupt("skills.state_json", e)))
        .collect()
}
