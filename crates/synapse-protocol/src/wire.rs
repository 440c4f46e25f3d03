//! JSON wire frame exchanged over a [`Transport`](crate::Transport).
//!
//! ```text
//! Agent                                   Hub
//!   |--- auth {agentId, tenantId, token} --->|
//!   |<-- ack / error (then close) -----------|
//!   |--- pull {vectorClock} ---------------->|
//!   |<-- ack {data, vectorClock, hasMore} ---|
//!   |--- push {vectorClock, data} ---------->|
//!   |<-- ack {accepted, rejected} -----------|
//!   |<-- push {data}   (broadcast from peer) |
//! ```

use serde::{Deserialize, Serialize};
use synapse_core::errors::{SynapseResult, TransportError};
use synapse_core::now_ms;
use synapse_crdt::VectorClock;

use crate::message::SyncMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Auth,
    Pull,
    Push,
    Ack,
    Error,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Pull => "pull",
            Self::Push => "push",
            Self::Ack => "ack",
            Self::Error => "error",
        }
    }
}

/// A pushed record the hub refused, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub sequence_number: u64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_clock: Option<VectorClock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<SyncMessage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set on errors that end the session until the agent re-authenticates.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auth_failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected: Option<Vec<Rejection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
    /// Hub log position a paged pull resumes after.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<i64>,
    pub timestamp: i64,
}

impl WireMessage {
    fn bare(message_type: MessageType) -> Self {
        Self {
            message_type,
            request_id: None,
            agent_id: None,
            tenant_id: None,
            token: None,
            vector_clock: None,
            data: None,
            error: None,
            auth_failed: false,
            accepted: None,
            rejected: None,
            has_more: None,
            cursor: None,
            timestamp: now_ms(),
        }
    }

    fn request(message_type: MessageType) -> Self {
        let mut msg = Self::bare(message_type);
        msg.request_id = Some(uuid::Uuid::new_v4().to_string());
        msg
    }

    pub fn auth(agent_id: &str, tenant_id: &str, token: &str) -> Self {
        let mut msg = Self::request(MessageType::Auth);
        msg.agent_id = Some(agent_id.to_string());
        msg.tenant_id = Some(tenant_id.to_string());
        msg.token = Some(token.to_string());
        msg
    }

    pub fn pull(clock: &VectorClock) -> Self {
        let mut msg = Self::request(MessageType::Pull);
        msg.vector_clock = Some(clock.clone());
        msg
    }

    pub fn push(clock: &VectorClock, data: Vec<SyncMessage>) -> Self {
        let mut msg = Self::request(MessageType::Push);
        msg.vector_clock = Some(clock.clone());
        msg.data = Some(data);
        msg
    }

    /// Unsolicited push the hub relays to co-tenant agents.
    pub fn broadcast(data: Vec<SyncMessage>) -> Self {
        let mut msg = Self::bare(MessageType::Push);
        msg.data = Some(data);
        msg
    }

    pub fn ack(request_id: Option<String>) -> Self {
        let mut msg = Self::bare(MessageType::Ack);
        msg.request_id = request_id;
        msg
    }

    pub fn error(request_id: Option<String>, error: impl Into<String>) -> Self {
        let mut msg = Self::bare(MessageType::Error);
        msg.request_id = request_id;
        msg.error = Some(error.into());
        msg
    }

    /// An error that closes the session: bad credentials, or a token that
    /// expired while the connection was open.
    pub fn auth_error(request_id: Option<String>, error: impl Into<String>) -> Self {
        let mut msg = Self::error(request_id, error);
        msg.auth_failed = true;
        msg
    }

    pub fn with_clock(mut self, clock: VectorClock) -> Self {
        self.vector_clock = Some(clock);
        self
    }

    pub fn with_cursor(mut self, cursor: Option<i64>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn with_data(mut self, data: Vec<SyncMessage>) -> Self {
        self.data = Some(data);
        self
    }

    /// Correlates a response with the request that produced it.
    pub fn answers(&self, request: &WireMessage) -> bool {
        self.request_id.is_some() && self.request_id == request.request_id
    }

    pub fn to_json(&self) -> SynapseResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(frame: &str) -> SynapseResult<Self> {
        serde_json::from_str(frame).map_err(|e| {
            TransportError::Decode {
                reason: e.to_string(),
            }
            .into()
        })
    }
}
