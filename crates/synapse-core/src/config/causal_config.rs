use serde::{Deserialize, Serialize};

use super::defaults;

/// Maps the smaller group size of an experiment to a confidence in `[0, 1]`.
///
/// Both curves are monotone non-decreasing and saturate at 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfidenceCurve {
    /// `min(n / saturation, 1)`.
    Linear { saturation: f64 },
    /// `1 - e^(-rate * n)`.
    Exponential { rate: f64 },
}

impl ConfidenceCurve {
    pub fn confidence(&self, matched_samples: u64) -> f64 {
        let n = matched_samples as f64;
        let raw = match *self {
            Self::Linear { saturation } => n / saturation,
            Self::Exponential { rate } => 1.0 - (-rate * n).exp(),
        };
        raw.clamp(0.0, 1.0)
    }
}

impl Default for ConfidenceCurve {
    fn default() -> Self {
        Self::Linear {
            saturation: defaults::DEFAULT_CONFIDENCE_SATURATION,
        }
    }
}

/// Eligibility thresholds for edge pruning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrunePolicy {
    pub min_confidence: f64,
    pub min_sample_size: u64,
    /// Only edges not updated within this window are deleted.
    pub retention_secs: u64,
}

impl Default for PrunePolicy {
    fn default() -> Self {
        Self {
            min_confidence: defaults::DEFAULT_PRUNE_MIN_CONFIDENCE,
            min_sample_size: defaults::DEFAULT_PRUNE_MIN_SAMPLE_SIZE,
            retention_secs: defaults::DEFAULT_PRUNE_RETENTION_SECS,
        }
    }
}

/// Causal memory graph configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CausalConfig {
    pub confidence_curve: ConfidenceCurve,
    /// Estimates with fewer matched samples are flagged unreliable.
    pub min_reliable_samples: u64,
    /// Running experiments with no observation inside this window auto-complete.
    pub experiment_idle_window_secs: u64,
    pub max_chain_depth: usize,
    pub prune: PrunePolicy,
}

impl Default for CausalConfig {
    fn default() -> Self {
        Self {
            confidence_curve: ConfidenceCurve::default(),
            min_reliable_samples: defaults::DEFAULT_MIN_RELIABLE_SAMPLES,
            experiment_idle_window_secs: defaults::DEFAULT_EXPERIMENT_IDLE_WINDOW_SECS,
            max_chain_depth: defaults::DEFAULT_MAX_CHAIN_DEPTH,
            prune: PrunePolicy::default(),
        }
    }
}
