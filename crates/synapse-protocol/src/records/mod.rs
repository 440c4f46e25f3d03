//! Record types that agents synchronize. Every mutable field is a CRDT.

mod causal_edge;
mod episode;
mod skill;

pub use causal_edge::CausalEdge;
pub use episode::{EpisodeContent, EpisodeRecord};
pub use skill::{SkillOutcome, SkillRecord};

use synapse_core::errors::ValidationError;

pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Empty { field })
    } else {
        Ok(())
    }
}

pub(crate) fn require_unit_range(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: 1.0,
        });
    }
    Ok(())
}
