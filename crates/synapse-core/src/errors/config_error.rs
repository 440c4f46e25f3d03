/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    #[error("invalid config value for {field}: {message}")]
    ValidationFailed { field: String, message: String },
}
