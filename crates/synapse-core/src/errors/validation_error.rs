/// Boundary validation failures. Abort the single offending record only.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} out of range: {value} not in [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is not a finite number")]
    NotFinite { field: &'static str },

    #[error("self-referencing edge on {memory_id}")]
    SelfLoop { memory_id: String },

    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },
}
