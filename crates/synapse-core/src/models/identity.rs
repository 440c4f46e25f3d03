use serde::{Deserialize, Serialize};

/// The authenticated identity bound to one hub session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentIdentity {
    pub agent_id: String,
    pub tenant_id: String,
}

impl AgentIdentity {
    pub fn new(agent_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            tenant_id: tenant_id.into(),
        }
    }
}
