//! hub v001: hub_records, change_log, tenant_clock.
//!
//! `hub_records` and `change_log` are append-only.

pub const MIGRATION_SQL: &str = "
CREATE TABLE IF NOT EXISTS hub_records (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id       TEXT NOT NULL,
    origin_node     TEXT NOT NULL,
    sequence_number INTEGER NOT NULL,
    record_id       TEXT NOT NULL,
    kind            TEXT NOT NULL,
    message_json    TEXT NOT NULL,
    vector_clock    TEXT NOT NULL,
    created_at_ms   INTEGER NOT NULL,
    UNIQUE (tenant_id, origin_node, sequence_number)
);

CREATE INDEX IF NOT EXISTS idx_hub_records_tenant ON hub_records(tenant_id, id);

CREATE TABLE IF NOT EXISTS change_log (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id       TEXT NOT NULL,
    agent_id        TEXT NOT NULL,
    operation       TEXT NOT NULL,
    episode_id      TEXT NOT NULL,
    vector_clock    TEXT NOT NULL,
    created_at_ms   INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_change_log_tenant ON change_log(tenant_id, id);

CREATE TABLE IF NOT EXISTS tenant_clock (
    tenant_id       TEXT PRIMARY KEY,
    vector_clock    TEXT NOT NULL,
    updated_at_ms   INTEGER NOT NULL
);
";
