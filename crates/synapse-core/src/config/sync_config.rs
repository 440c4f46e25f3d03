use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Agent-side sync loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Hub endpoint handed to the transport connector.
    pub hub_endpoint: Option<String>,
    /// Seconds between periodic sync cycles.
    pub sync_interval_secs: u64,
    /// How long to wait for an ack before treating the request as failed.
    pub request_timeout_ms: u64,
    /// First retry delay.
    pub initial_backoff_ms: u64,
    /// Backoff ceiling.
    pub max_backoff_ms: u64,
    /// Total attempts per sync (first try included).
    pub max_attempts: u32,
    /// Pending changes sent per push message.
    pub push_batch_size: usize,
}

impl SyncConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            hub_endpoint: None,
            sync_interval_secs: defaults::DEFAULT_SYNC_INTERVAL_SECS,
            request_timeout_ms: defaults::DEFAULT_REQUEST_TIMEOUT_MS,
            initial_backoff_ms: defaults::DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: defaults::DEFAULT_MAX_BACKOFF_MS,
            max_attempts: defaults::DEFAULT_MAX_ATTEMPTS,
            push_batch_size: defaults::DEFAULT_PUSH_BATCH_SIZE,
        }
    }
}
