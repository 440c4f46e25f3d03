use serde::{Deserialize, Serialize};
use synapse_core::errors::AuthError;
use synapse_protocol::SyncPayload;

/// Operations a token can be allowed to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "episodes:read")]
    EpisodesRead,
    #[serde(rename = "episodes:write")]
    EpisodesWrite,
    #[serde(rename = "skills:write")]
    SkillsWrite,
    #[serde(rename = "causal:write")]
    CausalWrite,
    #[serde(rename = "reconciliation:request")]
    ReconciliationRequest,
}

impl Scope {
    pub const ALL: [Scope; 5] = [
        Scope::EpisodesRead,
        Scope::EpisodesWrite,
        Scope::SkillsWrite,
        Scope::CausalWrite,
        Scope::ReconciliationRequest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EpisodesRead => "episodes:read",
            Self::EpisodesWrite => "episodes:write",
            Self::SkillsWrite => "skills:write",
            Self::CausalWrite => "causal:write",
            Self::ReconciliationRequest => "reconciliation:request",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }

    /// Scope needed to push a record carrying `payload`. `None` for payloads
    /// only the hub may produce.
    pub fn for_payload(payload: &SyncPayload) -> Option<Self> {
        match payload {
            SyncPayload::Episode(_) => Some(Self::EpisodesWrite),
            SyncPayload::Skill(_) => Some(Self::SkillsWrite),
            SyncPayload::CausalEdge(_) => Some(Self::CausalWrite),
            SyncPayload::ReconciliationRequest(_) => Some(Self::ReconciliationRequest),
            SyncPayload::ReconciliationResponse(_) => None,
        }
    }
}

/// Signed token body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub issuer: String,
    /// Agent id.
    pub subject: String,
    /// Epoch ms after which the token is refused.
    pub expiry: i64,
    #[serde(default)]
    pub roles: Vec<String>,
    pub scopes: Vec<Scope>,
    pub tenant_id: String,
}

impl Claims {
    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }

    pub fn require(&self, scope: Scope) -> Result<(), AuthError> {
        if self.has_scope(scope) {
            Ok(())
        } else {
            Err(AuthError::MissingScope {
                scope: scope.as_str().to_string(),
            })
        }
    }
}
