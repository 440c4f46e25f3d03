//! v002: causal_edges, causal_experiments, causal_observations.

pub const MIGRATION_SQL: &str = "
CREATE TABLE IF NOT EXISTS causal_edges (
    edge_id             TEXT NOT NULL UNIQUE,
    from_memory_id      TEXT NOT NULL,
    from_memory_type    TEXT NOT NULL,
    to_memory_id        TEXT NOT NULL,
    to_memory_type      TEXT NOT NULL,
    similarity          REAL NOT NULL,
    uplift              REAL NOT NULL,
    confidence          REAL NOT NULL CHECK (confidence >= 0.0 AND confidence <= 1.0),
    sample_size         INTEGER NOT NULL CHECK (sample_size >= 0),
    estimates           TEXT NOT NULL DEFAULT '{}',
    evidence_ids        TEXT NOT NULL DEFAULT '[]',
    confounder_score    REAL,
    mechanism           TEXT,
    version             TEXT NOT NULL DEFAULT '{}',
    last_modified_by    TEXT NOT NULL,
    created_at_ms       INTEGER NOT NULL,
    updated_at_ms       INTEGER NOT NULL,
    PRIMARY KEY (from_memory_id, to_memory_id)
);

CREATE INDEX IF NOT EXISTS idx_causal_edges_to ON causal_edges(to_memory_id);

CREATE TABLE IF NOT EXISTS causal_experiments (
    id                  TEXT PRIMARY KEY,
    name                TEXT NOT NULL,
    hypothesis          TEXT NOT NULL DEFAULT '',
    treatment_id        TEXT NOT NULL,
    treatment_type      TEXT NOT NULL,
    control_id          TEXT,
    target_memory_id    TEXT,
    target_memory_type  TEXT,
    status              TEXT NOT NULL DEFAULT 'running',
    start_time_ms       INTEGER NOT NULL,
    end_time_ms         INTEGER,
    last_observation_ms INTEGER NOT NULL,
    sample_size         INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_causal_experiments_status ON causal_experiments(status);

CREATE TABLE IF NOT EXISTS causal_observations (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    experiment_id   TEXT NOT NULL REFERENCES causal_experiments(id) ON DELETE CASCADE,
    episode_id      TEXT NOT NULL,
    is_treatment    INTEGER NOT NULL,
    outcome_value   REAL NOT NULL,
    outcome_type    TEXT NOT NULL,
    recorded_at_ms  INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_causal_observations_experiment ON causal_observations(experiment_id);
";
