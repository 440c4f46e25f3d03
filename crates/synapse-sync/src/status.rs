use serde::{Deserialize, Serialize};

/// What the agent presents to the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub agent_id: String,
    pub tenant_id: String,
    pub token: String,
}

impl Credentials {
    pub fn new(agent_id: impl Into<String>, tenant_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            tenant_id: tenant_id.into(),
            token: token.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SyncStatus {
    Disconnected,
    Authenticating,
    Connected,
    Syncing,
    /// Retries in flight.
    Degraded { attempt: u32, last_error: String },
    /// Retries exhausted; pending changes are kept.
    Offline,
    /// The hub refused our credentials. Nothing is retried until
    /// [`SyncEngine::update_token`](crate::SyncEngine::update_token).
    ReauthRequired,
}

/// Counts for one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub pulled: usize,
    pub applied: usize,
    pub conflicts: usize,
    pub duplicates: usize,
    /// Records whose causal predecessors had not arrived yet.
    pub deferred: usize,
    /// Remote records that failed validation.
    pub invalid: usize,
    pub pushed: usize,
    pub rejected: usize,
}

impl SyncReport {
    pub(crate) fn absorb(&mut self, other: &SyncReport) {
        self.pulled += other.pulled;
        self.applied += other.applied;
        self.conflicts += other.conflicts;
        self.duplicates += other.duplicates;
        self.deferred = other.deferred;
        self.invalid += other.invalid;
        self.pushed += other.pushed;
        self.rejected += other.rejected;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    StatusChanged(SyncStatus),
    SyncCompleted(SyncReport),
    /// Every retry failed; carries the last error message.
    PersistentFailure { attempts: u32, error: String },
    AuthFailed { reason: String },
}
