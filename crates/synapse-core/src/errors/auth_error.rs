/// Credential and authorization failures. Fatal for the session, never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing credential")]
    MissingCredential,

    #[error("malformed token: {reason}")]
    MalformedToken { reason: String },

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired at {expiry_ms}")]
    Expired { expiry_ms: i64 },

    #[error("untrusted issuer: {issuer}")]
    UntrustedIssuer { issuer: String },

    #[error("identity mismatch: claimed {claimed}, token grants {granted}")]
    IdentityMismatch { claimed: String, granted: String },

    #[error("missing scope {scope}")]
    MissingScope { scope: String },

    #[error("not authenticated: {message_type} received before auth")]
    NotAuthenticated { message_type: String },

    #[error("rejected by hub: {reason}")]
    Rejected { reason: String },
}
