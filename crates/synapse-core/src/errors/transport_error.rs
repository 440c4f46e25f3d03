/// Connection-level failures. Retried with truncated exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("connect to {endpoint} failed: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    #[error("no response within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("not connected")]
    NotConnected,

    #[error("unexpected {received} message, expected {expected}")]
    UnexpectedMessage { expected: String, received: String },

    #[error("hub error: {reason}")]
    Remote { reason: String },

    #[error("frame decode failed: {reason}")]
    Decode { reason: String },
}
