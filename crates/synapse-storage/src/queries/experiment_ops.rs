use rusqlite::{params, Connection, OptionalExtension, Row};
use synapse_core::errors::SynapseResult;
use tracing::debug;

use crate::to_storage_err;

pub const STATUS_RUNNING: &str = "running";
pub const STATUS_COMPLETED: &str = "completed";

#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentRow {
    pub id: String,
    pub name: String,
    pub hypothesis: String,
    pub treatment_id: String,
    pub treatment_type: String,
    pub control_id: Option<String>,
    pub target_memory_id: Option<String>,
    pub target_memory_type: Option<String>,
    pub status: String,
    pub start_time_ms: i64,
    pub end_time_ms: Option<i64>,
    pub last_observation_ms: i64,
    pub sample_size: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRow {
    pub experiment_id: String,
    pub episode_id: String,
    pub is_treatment: bool,
    pub outcome_value: f64,
    pub outcome_type: String,
    pub recorded_at_ms: i64,
}

const EXPERIMENT_COLUMNS: &str = "id, name, hypothesis, treatment_id, treatment_type, control_id,
    target_memory_id, target_memory_type, status, start_time_ms, end_time_ms,
    last_observation_ms, sample_size";

fn experiment_row(row: &Row<'_>) -> rusqlite::Result<ExperimentRow> {
    Ok(ExperimentRow {
        id: row.get(0)?,
        name: row.get(1)?,
        hypothesis: row.get(2)?,
        treatment_id: row.get(3)?,
        treatment_type: row.get(4)?,
        control_id: row.get(5)?,
        target_memory_id: row.get(6)?,
        target_memory_type: row.get(7)?,
        status: row.get(8)?,
        start_time_ms: row.get(9)?,
        end_time_ms: row.get(10)?,
        last_observation_ms: row.get(11)?,
        sample_size: row.get::<_, i64>(12)? as u64,
    })
}

pub fn insert_experiment(conn: &Connection, exp: &ExperimentRow) -> SynapseResult<()> {
    debug!(experiment_id = %exp.id, treatment = %exp.treatment_id, "creating experiment");
    conn.execute(
        &format!(
            "INSERT INTO causal_experiments ({EXPERIMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ),
        params![
            exp.id,
            exp.name,
            exp.hypothesis,
            exp.treatment_id,
            exp.treatment_type,
            exp.control_id,
            exp.target_memory_id,
            exp.target_memory_type,
            exp.status,
            exp.start_time_ms,
            exp.end_time_ms,
            exp.last_observation_ms,
            exp.sample_size as i64,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_experiment(conn: &Connection, id: &str) -> SynapseResult<Option<ExperimentRow>> {
    conn.query_row(
        &format!("SELECT {EXPERIMENT_COLUMNS} FROM causal_experiments WHERE id = ?1"),
        params![id],
        experiment_row,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Experiments, optionally filtered by status, oldest first.
pub fn list_experiments(conn: &Connection, status: Option<&str>) -> SynapseResult<Vec<ExperimentRow>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {EXPERIMENT_COLUMNS} FROM causal_experiments
             WHERE ?1 IS NULL OR status = ?1 ORDER BY start_time_ms, id"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![status], experiment_row)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows)
}

/// Append an observation and bump the experiment's counters.
pub fn insert_observation(conn: &Connection, obs: &ObservationRow) -> SynapseResult<()> {
    conn.execute(
        "INSERT INTO causal_observations
            (experiment_id, episode_id, is_treatment, outcome_value, outcome_type, recorded_at_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            obs.experiment_id,
            obs.episode_id,
            obs.is_treatment,
            obs.outcome_value,
            obs.outcome_type,
            obs.recorded_at_ms,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "UPDATE causal_experiments
         SET sample_size = sample_size + 1, last_observation_ms = MAX(last_observation_ms, ?2)
         WHERE id = ?1",
        params![obs.experiment_id, obs.recorded_at_ms],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn list_observations(conn: &Connection, experiment_id: &str) -> SynapseResult<Vec<ObservationRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT experiment_id, episode_id, is_treatment, outcome_value, outcome_type, recorded_at_ms
             FROM causal_observations WHERE experiment_id = ?1 ORDER BY id",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![experiment_id], |row| {
            Ok(ObservationRow {
                experiment_id: row.get(0)?,
                episode_id: row.get(1)?,
                is_treatment: row.get(2)?,
                outcome_value: row.get(3)?,
                outcome_type: row.get(4)?,
                recorded_at_ms: row.get(5)?,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows)
}

pub fn complete_experiment(conn: &Connection, id: &str, end_time_ms: i64) -> SynapseResult<bool> {
    let updated = conn
        .execute(
            "UPDATE causal_experiments SET status = ?1, end_time_ms = ?2 WHERE id = ?3 AND status = ?4",
            params![STATUS_COMPLETED, end_time_ms, id, STATUS_RUNNING],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(updated > 0)
}

/// Running experiments whose last observation is before `cutoff_ms`.
pub fn idle_running_experiments(conn: &Connection, cutoff_ms: i64) -> SynapseResult<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT id FROM causal_experiments
             WHERE status = ?1 AND last_observation_ms < ?2 ORDER BY id",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![STATUS_RUNNING, cutoff_ms], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<String>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows)
}
