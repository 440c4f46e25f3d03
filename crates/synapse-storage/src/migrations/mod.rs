//! Schema migrations using PRAGMA user_version.
//!
//! Agent databases and tenant databases have independent version sequences.

pub mod v001_sync_tables;
pub mod v002_causal_tables;
pub mod v003_certificate_tables;
pub mod hub_v001_federation_tables;

use rusqlite::Connection;
use synapse_core::errors::{StorageError, SynapseResult};

const AGENT_MIGRATIONS: &[(&str, u32)] = &[
    (v001_sync_tables::MIGRATION_SQL, 1),
    (v002_causal_tables::MIGRATION_SQL, 2),
    (v003_certificate_tables::MIGRATION_SQL, 3),
];

const HUB_MIGRATIONS: &[(&str, u32)] = &[(hub_v001_federation_tables::MIGRATION_SQL, 1)];

/// Bring an agent database to the latest schema.
pub fn run_agent_migrations(conn: &Connection) -> SynapseResult<()> {
    run(conn, AGENT_MIGRATIONS)
}

/// Bring a tenant database to the latest schema.
pub fn run_hub_migrations(conn: &Connection) -> SynapseResult<()> {
    run(conn, HUB_MIGRATIONS)
}

fn run(conn: &Connection, migrations: &[(&str, u32)]) -> SynapseResult<()> {
    let current = current_version(conn)?;
    for &(sql, version) in migrations {
        if current >= version {
            continue;
        }
        let failed = |e: rusqlite::Error| StorageError::MigrationFailed {
            version,
            reason: e.to_string(),
        };
        conn.execute_batch(sql).map_err(failed)?;
        conn.pragma_update(None, "user_version", version)
            .map_err(failed)?;
        tracing::info!(version, "applied migration");
    }
    Ok(())
}

/// Current schema version.
pub fn current_version(conn: &Connection) -> SynapseResult<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| {
            StorageError::SqliteError {
                message: e.to_string(),
            }
            .into()
        })
}
