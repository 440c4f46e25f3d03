use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Federation hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Directory for per-tenant databases. `None` keeps tenants in memory.
    pub data_dir: Option<String>,
    /// Connections silent for longer than this are closed.
    pub idle_timeout_secs: u64,
    /// Maximum records returned by one pull.
    pub max_pull_batch: usize,
    /// Issuer accepted on bearer tokens.
    pub token_issuer: String,
    /// Grace period applied to token expiry checks.
    pub clock_skew_leeway_ms: i64,
}

impl HubConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            idle_timeout_secs: defaults::DEFAULT_IDLE_TIMEOUT_SECS,
            max_pull_batch: defaults::DEFAULT_MAX_PULL_BATCH,
            token_issuer: defaults::DEFAULT_TOKEN_ISSUER.to_string(),
            clock_skew_leeway_ms: defaults::DEFAULT_CLOCK_SKEW_LEEWAY_MS,
        }
    }
}
