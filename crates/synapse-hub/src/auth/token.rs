use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use synapse_core::constants::TOKEN_KEY_LEN;
use synapse_core::errors::{AuthError, SynapseResult};
use synapse_core::now_ms;

use super::claims::{Claims, Scope};

const KEY_CONTEXT: &str = "synapse-hub bearer token signing key v1";

fn sign(key: &[u8; TOKEN_KEY_LEN], body: &str) -> blake3::Hash {
    blake3::keyed_hash(key, body.as_bytes())
}

fn malformed(reason: impl Into<String>) -> AuthError {
    AuthError::MalformedToken { reason: reason.into() }
}

/// Mints tokens. Lives wherever credentials are handed out.
#[derive(Clone)]
pub struct TokenIssuer {
    issuer: String,
    key: [u8; TOKEN_KEY_LEN],
}

impl TokenIssuer {
    pub fn new(issuer: impl Into<String>, key: [u8; TOKEN_KEY_LEN]) -> Self {
        Self {
            issuer: issuer.into(),
            key,
        }
    }

    /// Derive the signing key from arbitrary secret material.
    pub fn from_secret(issuer: impl Into<String>, secret: &[u8]) -> Self {
        Self::new(issuer, blake3::derive_key(KEY_CONTEXT, secret))
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn issue(&self, claims: &Claims) -> SynapseResult<String> {
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
        let mac = sign(&self.key, &body);
        Ok(format!("{body}.{}", URL_SAFE_NO_PAD.encode(mac.as_bytes())))
    }

    /// Token for `agent_id` in `tenant_id`, valid for `ttl` from now.
    pub fn mint(&self, agent_id: &str, tenant_id: &str, scopes: &[Scope], ttl: Duration) -> SynapseResult<String> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self.issue(&Claims {
            issuer: self.issuer.clone(),
            subject: agent_id.to_string(),
            expiry: now_ms().saturating_add(ttl_ms),
            roles: vec!["agent".to_string()],
            scopes: scopes.to_vec(),
            tenant_id: tenant_id.to_string(),
        })
    }

    /// Verifier sharing this issuer's key.
    pub fn verifier(&self, clock_skew_leeway_ms: i64) -> TokenVerifier {
        TokenVerifier {
            issuer: self.issuer.clone(),
            key: self.key,
            leeway_ms: clock_skew_leeway_ms,
        }
    }
}

/// Checks tokens presented on `auth`.
#[derive(Clone)]
pub struct TokenVerifier {
    issuer: String,
    key: [u8; TOKEN_KEY_LEN],
    leeway_ms: i64,
}

impl TokenVerifier {
    pub fn new(issuer: impl Into<String>, key: [u8; TOKEN_KEY_LEN], clock_skew_leeway_ms: i64) -> Self {
        Self {
            issuer: issuer.into(),
            key,
            leeway_ms: clock_skew_leeway_ms,
        }
    }

    /// Signature, issuer and expiry. The MAC is checked before the body is
    /// parsed.
    pub fn verify(&self, token: &str, now_ms: i64) -> Result<Claims, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingCredential);
        }
        let (body, mac) = token
            .split_once('.')
            .ok_or_else(|| malformed("expected two segments"))?;
        let mac = URL_SAFE_NO_PAD
            .decode(mac)
            .map_err(|e| malformed(format!("signature: {e}")))?;
        let mac: [u8; blake3::OUT_LEN] = mac
            .try_into()
            .map_err(|_| malformed("signature has wrong length"))?;
        // blake3::Hash equality is constant time.
        if blake3::Hash::from(mac) != sign(&self.key, body) {
            return Err(AuthError::InvalidSignature);
        }

        let raw = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|e| malformed(format!("claims: {e}")))?;
        let claims: Claims =
            serde_json::from_slice(&raw).map_err(|e| malformed(format!("claims: {e}")))?;

        if claims.issuer != self.issuer {
            return Err(AuthError::UntrustedIssuer {
                issuer: claims.issuer,
            });
        }
        self.check_expiry(&claims, now_ms)?;
        Ok(claims)
    }

    /// Refuse `claims` once `now_ms` reaches expiry plus the skew leeway.
    pub fn check_expiry(&self, claims: &Claims, now_ms: i64) -> Result<(), AuthError> {
        if now_ms >= claims.expiry.saturating_add(self.leeway_ms) {
            return Err(AuthError::Expired {
                expiry_ms: claims.expiry,
            });
        }
        Ok(())
    }

    /// [`verify`](Self::verify) plus the identity the connection claims.
    pub fn authenticate(
        &self,
        token: &str,
        agent_id: &str,
        tenant_id: &str,
        now_ms: i64,
    ) -> Result<Claims, AuthError> {
        let claims = self.verify(token, now_ms)?;
        if claims.subject != agent_id {
            return Err(AuthError::IdentityMismatch {
                claimed: agent_id.to_string(),
                granted: claims.subject,
            });
        }
        if claims.tenant_id != tenant_id {
            return Err(AuthError::IdentityMismatch {
                claimed: format!("tenant {tenant_id}"),
                granted: format!("tenant {}", claims.tenant_id),
            });
        }
        Ok(claims)
    }
}
