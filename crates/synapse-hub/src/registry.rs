//! SessionRegistry: live authenticated connections, keyed by connection id.
//!
//! A session is inserted when its connection authenticates and removed when
//! the connection task ends. Each entry holds the sender side of that
//! connection's outbox, which is how broadcasts reach it.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use synapse_protocol::WireMessage;
use tokio::sync::mpsc;
use tracing::debug;

pub type ConnectionId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub agent_id: String,
    pub tenant_id: String,
    pub connected_at_ms: i64,
}

struct SessionEntry {
    info: SessionInfo,
    outbox: mpsc::Sender<WireMessage>,
}

#[derive(Default)]
pub struct SessionRegistry {
    next_id: AtomicU64,
    sessions: DashMap<ConnectionId, SessionEntry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn register(&self, connection_id: ConnectionId, info: SessionInfo, outbox: mpsc::Sender<WireMessage>) {
        debug!(connection_id, agent_id = %info.agent_id, tenant_id = %info.tenant_id, "session registered");
        self.sessions.insert(connection_id, SessionEntry { info, outbox });
    }

    pub fn remove(&self, connection_id: ConnectionId) -> Option<SessionInfo> {
        let removed = self.sessions.remove(&connection_id).map(|(_, entry)| entry.info);
        if removed.is_some() {
            debug!(connection_id, "session removed");
        }
        removed
    }

    pub fn get(&self, connection_id: ConnectionId) -> Option<SessionInfo> {
        self.sessions.get(&connection_id).map(|entry| entry.info.clone())
    }

    /// Outboxes of every session in `tenant_id` except `exclude`.
    pub(crate) fn peers(
        &self,
        tenant_id: &str,
        exclude: ConnectionId,
    ) -> Vec<(ConnectionId, mpsc::Sender<WireMessage>)> {
        self.sessions
            .iter()
            .filter(|entry| *entry.key() != exclude && entry.info.tenant_id == tenant_id)
            .map(|entry| (*entry.key(), entry.outbox.clone()))
            .collect()
    }

    pub fn tenant_session_count(&self, tenant_id: &str) -> usize {
        self.sessions
            .iter()
            .filter(|entry| entry.info.tenant_id == tenant_id)
            .count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
