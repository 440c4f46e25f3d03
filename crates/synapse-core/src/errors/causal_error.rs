/// Causal graph and experiment errors.
#[derive(Debug, thiserror::Error)]
pub enum CausalError {
    #[error("experiment {experiment_id} is already completed")]
    ExperimentCompleted { experiment_id: String },

    #[error("experiment {experiment_id} has no {group} observations")]
    EmptyGroup {
        experiment_id: String,
        group: &'static str,
    },

    #[error("graph inconsistency: {details}")]
    GraphInconsistency { details: String },
}
