//! Tenant-partitioned hub persistence.
//!
//! Each tenant gets its own database (`tenant-<hex id>.db` under the data
//! directory, or an in-memory database), so a slow tenant never holds a lock
//! another tenant needs.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use synapse_core::errors::{StorageError, SynapseResult};
use synapse_crdt::VectorClock;
use synapse_protocol::SyncMessage;
use tracing::{debug, info};

use crate::migrations::run_hub_migrations;
use crate::pool::WriteConnection;
use crate::queries::hub_ops::{self, ChangeLogRow};

/// Rows read per index range scan while filling a pull page.
const SCAN_CHUNK: usize = 256;

/// Result of persisting one push batch.
#[derive(Debug, Clone, Default)]
pub struct PersistOutcome {
    /// Records stored for the first time, in batch order.
    pub inserted: Vec<SyncMessage>,
    /// Sequence numbers the hub already had.
    pub duplicates: Vec<u64>,
    /// Tenant clock after the batch.
    pub hub_clock: VectorClock,
}

/// One page of a pull.
#[derive(Debug, Clone, Default)]
pub struct ChangePage {
    pub records: Vec<SyncMessage>,
    pub has_more: bool,
    /// Log position of the last record served; the next page starts after it.
    pub cursor: Option<i64>,
    /// Tenant clock from the same snapshot as `records`.
    pub hub_clock: VectorClock,
}

pub struct HubStore {
    data_dir: Option<PathBuf>,
    tenants: DashMap<String, Arc<TenantStore>>,
}

impl HubStore {
    /// File-backed hub rooted at `data_dir`.
    pub fn open(data_dir: impl Into<PathBuf>) -> SynapseResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(|e| StorageError::SqliteError {
            message: format!("create {}: {e}", data_dir.display()),
        })?;
        info!(data_dir = %data_dir.display(), "opened hub store");
        Ok(Self {
            data_dir: Some(data_dir),
            tenants: DashMap::new(),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            tenants: DashMap::new(),
        }
    }

    /// The store for `tenant_id`, created and migrated on first use.
    pub fn tenant(&self, tenant_id: &str) -> SynapseResult<Arc<TenantStore>> {
        if let Some(existing) = self.tenants.get(tenant_id) {
            return Ok(Arc::clone(existing.value()));
        }
        match self.tenants.entry(tenant_id.to_string()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let store = Arc::new(self.open_tenant(tenant_id)?);
                entry.insert(Arc::clone(&store));
                Ok(store)
            }
        }
    }

    pub fn tenant_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tenants.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    fn open_tenant(&self, tenant_id: &str) -> SynapseResult<TenantStore> {
        let mut writer = match &self.data_dir {
            Some(dir) => WriteConnection::open(&dir.join(tenant_file_name(tenant_id)))?,
            None => WriteConnection::open_in_memory()?,
        };
        writer.with_conn_mut(run_hub_migrations)?;
        debug!(tenant_id, "opened tenant store");
        Ok(TenantStore {
            tenant_id: tenant_id.to_string(),
            writer,
        })
    }
}

/// Tenant ids are arbitrary strings; hex keeps the file name safe.
fn tenant_file_name(tenant_id: &str) -> String {
    let mut name = String::from("tenant-");
    for byte in tenant_id.as_bytes() {
        let _ = write!(name, "{byte:02x}");
    }
    name.push_str(".db");
    name
}

pub struct TenantStore {
    tenant_id: String,
    writer: WriteConnection,
}

impl TenantStore {
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Store a push batch atomically: new records, one change-log row per new
    /// record, and the tenant clock merged with the pushing agent's clock.
    /// Records already stored under the same `(origin, sequence)` are
    /// reported as duplicates and change nothing.
    pub async fn persist_push(
        &self,
        agent_id: &str,
        messages: &[SyncMessage],
        agent_clock: &VectorClock,
        now_ms: i64,
    ) -> SynapseResult<PersistOutcome> {
        let tenant_id = self.tenant_id.as_str();
        self.writer
            .with_transaction(|conn| {
                let mut outcome = PersistOutcome {
                    hub_clock: hub_ops::load_tenant_clock(conn, tenant_id)?,
                    ..Default::default()
                };
                for message in messages {
                    if !hub_ops::insert_record(conn, tenant_id, message, now_ms)? {
                        outcome.duplicates.push(message.sequence_number);
                        continue;
                    }
                    hub_ops::append_change(
                        conn,
                        &ChangeLogRow {
                            tenant_id: tenant_id.to_string(),
                            agent_id: agent_id.to_string(),
                            operation: message.operation().to_string(),
                            episode_id: message.record_id(),
                            vector_clock: message.vector_clock.clone(),
                            created_at_ms: now_ms,
                        },
                    )?;
                    outcome.hub_clock.merge(&message.vector_clock);
                    outcome.inserted.push(message.clone());
                }
                outcome.hub_clock.merge(agent_clock);
                hub_ops::save_tenant_clock(conn, tenant_id, &outcome.hub_clock, now_ms)?;
                Ok(outcome)
            })
            .await
    }

    /// Records whose clock is not covered by `known`, oldest first, at most
    /// `limit` of them, read together with the tenant clock.
    ///
    /// The log is scanned in index order from the watermark `after` (a
    /// previous page's `cursor`) and only as far as it takes to fill the
    /// page and see whether another record is waiting.
    pub async fn changes_since(
        &self,
        known: &VectorClock,
        after: Option<i64>,
        limit: usize,
    ) -> SynapseResult<ChangePage> {
        let tenant_id = self.tenant_id.as_str();
        let limit = limit.max(1);
        let chunk_size = limit.max(SCAN_CHUNK);
        self.writer
            .with_conn(|conn| {
                let hub_clock = hub_ops::load_tenant_clock(conn, tenant_id)?;
                let mut records = Vec::with_capacity(limit);
                let mut cursor = after;
                let mut watermark = after.unwrap_or(0);
                let mut has_more = false;
                loop {
                    let chunk = hub_ops::records_after(conn, tenant_id, watermark, chunk_size)?;
                    let exhausted = chunk.len() < chunk_size;
                    for row in chunk {
                        watermark = row.id;
                        if row.message.vector_clock.is_covered_by(known) {
                            continue;
                        }
                        if records.len() == limit {
                            has_more = true;
                            break;
                        }
                        cursor = Some(row.id);
                        records.push(row.message);
                    }
                    if has_more || exhausted {
                        break;
                    }
                }
                Ok(ChangePage {
                    records,
                    has_more,
                    cursor,
                    hub_clock,
                })
            })
            .await
    }

    pub async fn all_records(&self) -> SynapseResult<Vec<SyncMessage>> {
        let tenant_id = self.tenant_id.as_str();
        let rows = self
            .writer
            .with_conn(|conn| hub_ops::records_for_tenant(conn, tenant_id))
            .await?;
        Ok(rows.into_iter().map(|row| row.message).collect())
    }

    pub async fn change_log(&self) -> SynapseResult<Vec<ChangeLogRow>> {
        let tenant_id = self.tenant_id.as_str();
        self.writer
            .with_conn(|conn| hub_ops::change_log_for_tenant(conn, tenant_id))
            .await
    }

    pub async fn clock(&self) -> SynapseResult<VectorClock> {
        let tenant_id = self.tenant_id.as_str();
        self.writer
            .with_conn(|conn| hub_ops::load_tenant_clock(conn, tenant_id))
            .await
    }
}
