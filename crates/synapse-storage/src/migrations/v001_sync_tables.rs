//! v001: episodes, skills, pending_changes, sync_state.

pub const MIGRATION_SQL: &str = "
CREATE TABLE IF NOT EXISTS episodes (
    id              TEXT PRIMARY KEY,
    state_json      TEXT NOT NULL,
    deleted         INTEGER NOT NULL DEFAULT 0,
    updated_at_ms   INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_episodes_deleted ON episodes(deleted);

CREATE TABLE IF NOT EXISTS skills (
    id              TEXT PRIMARY KEY,
    state_json      TEXT NOT NULL,
    updated_at_ms   INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS pending_changes (
    sequence_number INTEGER PRIMARY KEY,
    record_id       TEXT NOT NULL,
    kind            TEXT NOT NULL,
    operation       TEXT NOT NULL,
    message_json    TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'pending',
    attempts        INTEGER NOT NULL DEFAULT 0,
    last_error      TEXT,
    created_at_ms   INTEGER NOT NULL,
    acked_at_ms     INTEGER
);

CREATE INDEX IF NOT EXISTS idx_pending_changes_status ON pending_changes(status);

CREATE TABLE IF NOT EXISTS sync_state (
    id              INTEGER PRIMARY KEY CHECK (id = 1),
    node_id         TEXT NOT NULL,
    vector_clock    TEXT NOT NULL DEFAULT '{}',
    next_sequence   INTEGER NOT NULL DEFAULT 1,
    last_sync_at_ms INTEGER
);
";
