//! Treatment/control experiments and their observations.

use serde::{Deserialize, Serialize};
use synapse_core::errors::{SynapseError, SynapseResult, ValidationError};
use synapse_storage::queries::experiment_ops::{
    ExperimentRow, ObservationRow, STATUS_COMPLETED, STATUS_RUNNING,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    Running,
    Completed,
}

impl ExperimentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => STATUS_RUNNING,
            Self::Completed => STATUS_COMPLETED,
        }
    }

    fn parse(raw: &str) -> SynapseResult<Self> {
        match raw {
            STATUS_RUNNING => Ok(Self::Running),
            STATUS_COMPLETED => Ok(Self::Completed),
            other => Err(ValidationError::InvalidRecord {
                reason: format!("unknown experiment status '{other}'"),
            }
            .into()),
        }
    }
}

/// What to test: does `treatment_id` move outcomes? When a target is given,
/// completing the experiment records the estimate as the edge
/// `treatment -> target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentSpec {
    pub name: String,
    pub hypothesis: String,
    pub treatment_id: String,
    pub treatment_type: String,
    #[serde(default)]
    pub control_id: Option<String>,
    #[serde(default)]
    pub target_memory_id: Option<String>,
    #[serde(default)]
    pub target_memory_type: Option<String>,
}

impl ExperimentSpec {
    pub fn new(name: impl Into<String>, treatment_id: impl Into<String>, treatment_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hypothesis: String::new(),
            treatment_id: treatment_id.into(),
            treatment_type: treatment_type.into(),
            control_id: None,
            target_memory_id: None,
            target_memory_type: None,
        }
    }

    pub fn with_hypothesis(mut self, hypothesis: impl Into<String>) -> Self {
        self.hypothesis = hypothesis.into();
        self
    }

    pub fn with_target(mut self, memory_id: impl Into<String>, memory_type: impl Into<String>) -> Self {
        self.target_memory_id = Some(memory_id.into());
        self.target_memory_type = Some(memory_type.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Empty { field: "experiment.name" });
        }
        if self.treatment_id.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "experiment.treatment_id",
            });
        }
        if self.target_memory_id.as_deref() == Some(self.treatment_id.as_str()) {
            return Err(ValidationError::SelfLoop {
                memory_id: self.treatment_id.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    pub id: String,
    pub spec: ExperimentSpec,
    pub status: ExperimentStatus,
    pub start_time_ms: i64,
    pub end_time_ms: Option<i64>,
    pub last_observation_ms: i64,
    pub sample_size: u64,
}

impl Experiment {
    pub fn is_running(&self) -> bool {
        self.status == ExperimentStatus::Running
    }

    pub(crate) fn to_row(&self) -> ExperimentRow {
        ExperimentRow {
            id: self.id.clone(),
            name: self.spec.name.clone(),
            hypothesis: self.spec.hypothesis.clone(),
            treatment_id: self.spec.treatment_id.clone(),
            treatment_type: self.spec.treatment_type.clone(),
            control_id: self.spec.control_id.clone(),
            target_memory_id: self.spec.target_memory_id.clone(),
            target_memory_type: self.spec.target_memory_type.clone(),
            status: self.status.as_str().to_string(),
            start_time_ms: self.start_time_ms,
            end_time_ms: self.end_time_ms,
            last_observation_ms: self.last_observation_ms,
            sample_size: self.sample_size,
        }
    }
}

impl TryFrom<ExperimentRow> for Experiment {
    type Error = SynapseError;

    fn try_from(row: ExperimentRow) -> SynapseResult<Self> {
        Ok(Self {
            status: ExperimentStatus::parse(&row.status)?,
            id: row.id,
            spec: ExperimentSpec {
                name: row.name,
                hypothesis: row.hypothesis,
                treatment_id: row.treatment_id,
                treatment_type: row.treatment_type,
                control_id: row.control_id,
                target_memory_id: row.target_memory_id,
                target_memory_type: row.target_memory_type,
            },
            start_time_ms: row.start_time_ms,
            end_time_ms: row.end_time_ms,
            last_observation_ms: row.last_observation_ms,
            sample_size: row.sample_size,
        })
    }
}

/// One measured outcome of an episode, in the treatment or control group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub experiment_id: String,
    pub episode_id: String,
    pub is_treatment: bool,
    pub outcome_value: f64,
    /// Free-form label such as `reward` or `success`.
    pub outcome_type: String,
}

impl Observation {
    pub fn treatment(experiment_id: &str, episode_id: &str, outcome_value: f64) -> Self {
        Self::new(experiment_id, episode_id, true, outcome_value)
    }

    pub fn control(experiment_id: &str, episode_id: &str, outcome_value: f64) -> Self {
        Self::new(experiment_id, episode_id, false, outcome_value)
    }

    fn new(experiment_id: &str, episode_id: &str, is_treatment: bool, outcome_value: f64) -> Self {
        Self {
            experiment_id: experiment_id.to_string(),
            episode_id: episode_id.to_string(),
            is_treatment,
            outcome_value,
            outcome_type: "reward".to_string(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if !self.outcome_value.is_finite() {
            return Err(ValidationError::NotFinite {
                field: "observation.outcome_value",
            });
        }
        if self.episode_id.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "observation.episode_id",
            });
        }
        Ok(())
    }

    pub(crate) fn to_row(&self, recorded_at_ms: i64) -> ObservationRow {
        ObservationRow {
            experiment_id: self.experiment_id.clone(),
            episode_id: self.episode_id.clone(),
            is_treatment: self.is_treatment,
            outcome_value: self.outcome_value,
            outcome_type: self.outcome_type.clone(),
            recorded_at_ms,
        }
    }
}

impl From<ObservationRow> for Observation {
    fn from(row: ObservationRow) -> Self {
        Self {
            experiment_id: row.experiment_id,
            episode_id: row.episode_id,
            is_treatment: row.is_treatment,
            outcome_value: row.outcome_value,
            outcome_type: row.outcome_type,
        }
    }
}
