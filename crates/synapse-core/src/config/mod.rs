//! Layered configuration: compiled defaults, then a TOML file, then
//! `SYNAPSE_*` environment overrides, then validation.

pub mod causal_config;
pub mod defaults;
pub mod hub_config;
pub mod recall_config;
pub mod storage_config;
pub mod sync_config;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use causal_config::{CausalConfig, ConfidenceCurve, PrunePolicy};
pub use hub_config::HubConfig;
pub use recall_config::{HittingSetStrategy, RecallConfig};
pub use storage_config::StorageConfig;
pub use sync_config::SyncConfig;

use crate::errors::{ConfigError, SynapseResult};

/// Top-level configuration aggregating all subsystem configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SynapseConfig {
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub hub: HubConfig,
    pub causal: CausalConfig,
    pub recall: RecallConfig,
}

impl SynapseConfig {
    /// Parse from a TOML string. Missing sections use defaults.
    pub fn from_toml(s: &str) -> SynapseResult<Self> {
        toml::from_str(s).map_err(|e| {
            ConfigError::ParseFailed {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Load a TOML file, apply environment overrides, and validate.
    pub fn load(path: &Path) -> SynapseResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut config = Self::from_toml(&raw)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SYNAPSE_HUB_ENDPOINT`, `SYNAPSE_SYNC_INTERVAL_SECS`, and `SYNAPSE_DB_PATH`.
    pub fn apply_env_overrides(&mut self) -> SynapseResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Override application with an injectable lookup (tests avoid mutating the process env).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> SynapseResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("SYNAPSE_HUB_ENDPOINT") {
            self.sync.hub_endpoint = Some(endpoint);
        }
        if let Some(raw) = lookup("SYNAPSE_SYNC_INTERVAL_SECS") {
            self.sync.sync_interval_secs =
                raw.parse().map_err(|_| ConfigError::ValidationFailed {
                    field: "SYNAPSE_SYNC_INTERVAL_SECS".to_string(),
                    message: format!("not an integer: {raw}"),
                })?;
        }
        if let Some(path) = lookup("SYNAPSE_DB_PATH") {
            self.storage.db_path = Some(path);
        }
        Ok(())
    }

    /// Reject values that would make a subsystem misbehave.
    pub fn validate(&self) -> SynapseResult<()> {
        if self.sync.max_attempts == 0 {
            return Err(invalid("sync.max_attempts", "must be at least 1"));
        }
        if self.sync.initial_backoff_ms > self.sync.max_backoff_ms {
            return Err(invalid(
                "sync.initial_backoff_ms",
                "must not exceed sync.max_backoff_ms",
            ));
        }
        if self.sync.push_batch_size == 0 {
            return Err(invalid("sync.push_batch_size", "must be at least 1"));
        }
        if self.hub.max_pull_batch == 0 {
            return Err(invalid("hub.max_pull_batch", "must be at least 1"));
        }
        if self.hub.token_issuer.trim().is_empty() {
            return Err(invalid("hub.token_issuer", "must not be empty"));
        }
        match self.causal.confidence_curve {
            ConfidenceCurve::Linear { saturation } if !(saturation > 0.0) => {
                return Err(invalid(
                    "causal.confidence_curve.saturation",
                    "must be positive",
                ));
            }
            ConfidenceCurve::Exponential { rate } if !(rate > 0.0) => {
                return Err(invalid("causal.confidence_curve.rate", "must be positive"));
            }
            _ => {}
        }
        if !(0.0..=1.0).contains(&self.causal.prune.min_confidence) {
            return Err(invalid("causal.prune.min_confidence", "must be within [0, 1]"));
        }
        for (field, weight) in [
            ("recall.alpha", self.recall.alpha),
            ("recall.beta", self.recall.beta),
            ("recall.gamma", self.recall.gamma),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(invalid(field, "must be a finite non-negative number"));
            }
        }
        if let HittingSetStrategy::Exhaustive { max_chunks } = self.recall.hitting_set {
            if max_chunks == 0 || max_chunks > 24 {
                return Err(invalid("recall.hitting_set.max_chunks", "must be within 1..=24"));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> crate::errors::SynapseError {
    ConfigError::ValidationFailed {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}
