//! Error taxonomy.
//!
//! Conflicts between concurrent updates are not errors: they are resolved
//! deterministically by CRDT merge rules and never surface here.

mod auth_error;
mod causal_error;
mod config_error;
mod integrity_error;
mod storage_error;
mod transport_error;
mod validation_error;

pub use auth_error::AuthError;
pub use causal_error::CausalError;
pub use config_error::ConfigError;
pub use integrity_error::IntegrityError;
pub use storage_error::StorageError;
pub use transport_error::TransportError;
pub use validation_error::ValidationError;

/// Top-level error for every Synapse operation.
#[derive(Debug, thiserror::Error)]
pub enum SynapseError {
    #[error("auth error: {0}")]
    AuthError(#[from] AuthError),

    #[error("transport error: {0}")]
    TransportError(#[from] TransportError),

    #[error("validation error: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("integrity error: {0}")]
    IntegrityError(#[from] IntegrityError),

    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("causal error: {0}")]
    CausalError(#[from] CausalError),

    #[error("config error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("concurrency error: {0}")]
    ConcurrencyError(String),
}

impl SynapseError {
    /// Connection-level failures that the sync loop retries with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportError(_))
    }

    /// Credential failures end the session and require re-authentication.
    pub fn is_fatal_auth(&self) -> bool {
        matches!(self, Self::AuthError(_))
    }
}

/// Convenience alias used across all Synapse crates.
pub type SynapseResult<T> = Result<T, SynapseError>;
