//! Uplift estimation: difference in mean outcome between treated and
//! control observations.

use serde::{Deserialize, Serialize};
use synapse_core::config::ConfidenceCurve;
use synapse_core::errors::CausalError;

use crate::experiment::Observation;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpliftEstimate {
    /// `treatment_mean - control_mean`.
    pub uplift: f64,
    /// Curve applied to `min(treatment_count, control_count)`.
    pub confidence: f64,
    pub treatment_count: u64,
    pub control_count: u64,
    pub treatment_mean: f64,
    pub control_mean: f64,
    /// False while the smaller group is below the reliability threshold.
    pub reliable: bool,
}

impl UpliftEstimate {
    pub fn matched_samples(&self) -> u64 {
        self.treatment_count.min(self.control_count)
    }

    pub fn sample_size(&self) -> u64 {
        self.treatment_count + self.control_count
    }
}

/// Estimate uplift from raw observations. Both groups need at least one
/// observation.
pub fn estimate(
    experiment_id: &str,
    observations: &[Observation],
    curve: &ConfidenceCurve,
    min_reliable_samples: u64,
) -> Result<UpliftEstimate, CausalError> {
    let (treated, control): (Vec<&Observation>, Vec<&Observation>) =
        observations.iter().partition(|o| o.is_treatment);

    let treatment_mean = mean(&treated).ok_or_else(|| CausalError::EmptyGroup {
        experiment_id: experiment_id.to_string(),
        group: "treatment",
    })?;
    let control_mean = mean(&control).ok_or_else(|| CausalError::EmptyGroup {
        experiment_id: experiment_id.to_string(),
        group: "control",
    })?;

    let matched = treated.len().min(control.len()) as u64;
    Ok(UpliftEstimate {
        uplift: treatment_mean - control_mean,
        confidence: curve.confidence(matched),
        treatment_count: treated.len() as u64,
        control_count: control.len() as u64,
        treatment_mean,
        control_mean,
        reliable: matched >= min_reliable_samples,
    })
}

fn mean(group: &[&Observation]) -> Option<f64> {
    if group.is_empty() {
        return None;
    }
    Some(group.iter().map(|o| o.outcome_value).sum::<f64>() / group.len() as f64)
}
