//! The federation hub: authentication, tenant-scoped pull and push, co-tenant broadcast.

use std::sync::Arc;

use synapse_core::config::HubConfig;
use synapse_core::errors::{AuthError, SynapseResult};
use synapse_core::now_ms;
use synapse_observability::tracing_setup::events;
use synapse_observability::HubMetrics;
use synapse_protocol::{
    channel_pair, ChannelTransport, MessageType, ReconciliationResponse, Rejection, SyncMessage, SyncPayload,
    WireMessage,
};
use synapse_storage::HubStore;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::auth::{Claims, Scope, TokenVerifier};
use crate::connection::serve_connection;
use crate::registry::{ConnectionId, SessionInfo, SessionRegistry};

/// Node id stamped on envelopes the hub itself produces.
pub const HUB_NODE_ID: &str = "hub";

/// Broadcasts queued per connection before further ones count as failed.
pub const OUTBOX_CAPACITY: usize = 256;

/// Identity of an authenticated connection.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub connection_id: ConnectionId,
    pub agent_id: String,
    pub tenant_id: String,
    pub claims: Claims,
}

pub struct FederationHub {
    store: HubStore,
    verifier: TokenVerifier,
    registry: SessionRegistry,
    config: HubConfig,
    metrics: Arc<HubMetrics>,
}

impl FederationHub {
    pub fn new(store: HubStore, verifier: TokenVerifier, config: HubConfig) -> Self {
        Self {
            store,
            verifier,
            registry: SessionRegistry::new(),
            config,
            metrics: Arc::new(HubMetrics::new()),
        }
    }

    /// Hub with tenant databases under `config.data_dir`, or in memory.
    pub fn from_config(config: HubConfig, verifier: TokenVerifier) -> SynapseResult<Self> {
        let store = match &config.data_dir {
            Some(dir) => HubStore::open(dir)?,
            None => HubStore::in_memory(),
        };
        Ok(Self::new(store, verifier, config))
    }

    pub fn store(&self) -> &HubStore {
        &self.store
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<HubMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Open an in-process connection served by its own task. Returns the
    /// agent's end.
    pub fn accept(self: &Arc<Self>) -> ChannelTransport {
        let (agent_end, hub_end) = channel_pair();
        tokio::spawn(serve_connection(Arc::clone(self), hub_end));
        agent_end
    }

    /// Verify the token on an `auth` message and register the session.
    pub fn handle_auth(
        &self,
        connection_id: ConnectionId,
        request: &WireMessage,
        outbox: mpsc::Sender<WireMessage>,
    ) -> Result<AuthContext, AuthError> {
        let (Some(agent_id), Some(tenant_id), Some(token)) =
            (&request.agent_id, &request.tenant_id, &request.token)
        else {
            return Err(AuthError::MissingCredential);
        };
        let now = now_ms();
        let claims = self.verifier.authenticate(token, agent_id, tenant_id, now)?;
        self.registry.register(
            connection_id,
            SessionInfo {
                agent_id: agent_id.clone(),
                tenant_id: tenant_id.clone(),
                connected_at_ms: now,
            },
            outbox,
        );
        events::agent_authenticated(tenant_id, agent_id, connection_id);
        Ok(AuthContext {
            connection_id,
            agent_id: agent_id.clone(),
            tenant_id: tenant_id.clone(),
            claims,
        })
    }

    /// The session's token must still be valid for every operation, not only
    /// at `auth`.
    pub fn check_session(&self, ctx: &AuthContext) -> Result<(), AuthError> {
        self.verifier.check_expiry(&ctx.claims, now_ms()).inspect_err(|e| {
            self.metrics.auth_failed();
            events::auth_rejected(Some(&ctx.agent_id), &e.to_string());
        })
    }

    /// Tenant records not covered by the caller's clock, one page at a time.
    /// A request `cursor` resumes after the previous page.
    pub async fn handle_pull(&self, ctx: &AuthContext, request: &WireMessage) -> SynapseResult<WireMessage> {
        ctx.claims.require(Scope::EpisodesRead)?;
        let known = request.vector_clock.clone().unwrap_or_default();
        let tenant = self.store.tenant(&ctx.tenant_id)?;
        let page = tenant
            .changes_since(&known, request.cursor, self.config.max_pull_batch.max(1))
            .await?;
        debug!(
            tenant_id = %ctx.tenant_id,
            agent_id = %ctx.agent_id,
            known = %known,
            records = page.records.len(),
            has_more = page.has_more,
            "served pull"
        );
        let mut ack = WireMessage::ack(request.request_id.clone())
            .with_data(page.records)
            .with_clock(page.hub_clock)
            .with_cursor(page.cursor);
        ack.has_more = Some(page.has_more);
        Ok(ack)
    }

    /// Persist the admissible records of a push, report the rest, relay new
    /// records to co-tenant sessions. A reconciliation request in the batch
    /// is answered in the ack's data.
    pub async fn handle_push(&self, ctx: &AuthContext, request: &WireMessage) -> SynapseResult<WireMessage> {
        ctx.claims.require(Scope::EpisodesWrite)?;
        let data = request.data.as_deref().unwrap_or_default();
        let agent_clock = request.vector_clock.clone().unwrap_or_default();

        let wants_reconciliation = data
            .iter()
            .any(|m| matches!(m.payload, SyncPayload::ReconciliationRequest(_)));
        if wants_reconciliation {
            ctx.claims.require(Scope::ReconciliationRequest)?;
        }

        let mut admitted = Vec::with_capacity(data.len());
        let mut rejected = Vec::new();
        for message in data {
            if matches!(message.payload, SyncPayload::ReconciliationRequest(_)) {
                continue;
            }
            match admit(ctx, message) {
                Ok(()) => admitted.push(message.clone()),
                Err(reason) => {
                    warn!(
                        tenant_id = %ctx.tenant_id,
                        agent_id = %ctx.agent_id,
                        seq = message.sequence_number,
                        reason = %reason,
                        "rejected pushed record"
                    );
                    rejected.push(Rejection {
                        sequence_number: message.sequence_number,
                        reason,
                    });
                }
            }
        }

        let tenant = self.store.tenant(&ctx.tenant_id)?;
        let outcome = tenant
            .persist_push(&ctx.agent_id, &admitted, &agent_clock, now_ms())
            .await?;
        self.metrics
            .push_persisted(outcome.inserted.len(), outcome.duplicates.len(), rejected.len());
        events::records_pushed(
            &ctx.tenant_id,
            &ctx.agent_id,
            outcome.inserted.len(),
            outcome.duplicates.len(),
            rejected.len(),
        );

        let accepted: Vec<u64> = outcome
            .inserted
            .iter()
            .map(|m| m.sequence_number)
            .chain(outcome.duplicates.iter().copied())
            .collect();
        let mut ack = WireMessage::ack(request.request_id.clone()).with_clock(outcome.hub_clock.clone());
        ack.accepted = Some(accepted);
        ack.rejected = Some(rejected);

        if wants_reconciliation {
            let records = tenant.all_records().await?;
            info!(tenant_id = %ctx.tenant_id, agent_id = %ctx.agent_id, records = records.len(), "answering reconciliation");
            ack.data = Some(vec![SyncMessage {
                sequence_number: 0,
                timestamp_ms: now_ms(),
                node_id: HUB_NODE_ID.to_string(),
                vector_clock: outcome.hub_clock.clone(),
                payload: SyncPayload::ReconciliationResponse(ReconciliationResponse {
                    records,
                    hub_clock: outcome.hub_clock,
                }),
            }]);
        }

        if !outcome.inserted.is_empty() {
            self.broadcast(ctx, outcome.inserted);
        }
        Ok(ack)
    }

    /// Best effort: a full or closed outbox is counted and logged, never
    /// surfaced to the pushing agent.
    fn broadcast(&self, ctx: &AuthContext, records: Vec<SyncMessage>) {
        let peers = self.registry.peers(&ctx.tenant_id, ctx.connection_id);
        if peers.is_empty() {
            return;
        }
        let message = WireMessage::broadcast(records);
        for (connection_id, outbox) in peers {
            match outbox.try_send(message.clone()) {
                Ok(()) => self.metrics.broadcast_sent(),
                Err(e) => {
                    let reason = match e {
                        TrySendError::Full(_) => "outbox full",
                        TrySendError::Closed(_) => "connection closed",
                    };
                    self.metrics.broadcast_failed();
                    events::broadcast_failed(&ctx.tenant_id, connection_id, reason);
                }
            }
        }
    }

    /// Route one inbound message. Returns the reply and whether the
    /// connection stays open.
    pub(crate) async fn dispatch(
        &self,
        connection_id: ConnectionId,
        session: &mut Option<AuthContext>,
        outbox: &mpsc::Sender<WireMessage>,
        request: WireMessage,
    ) -> (WireMessage, bool) {
        let request_id = request.request_id.clone();
        let Some(ctx) = session.as_ref() else {
            let result = match request.message_type {
                MessageType::Auth => self.handle_auth(connection_id, &request, outbox.clone()),
                other => Err(AuthError::NotAuthenticated {
                    message_type: other.as_str().to_string(),
                }),
            };
            return match result {
                Ok(ctx) => {
                    *session = Some(ctx);
                    (WireMessage::ack(request_id), true)
                }
                Err(e) => {
                    self.metrics.auth_failed();
                    events::auth_rejected(request.agent_id.as_deref(), &e.to_string());
                    (WireMessage::auth_error(request_id, e.to_string()), false)
                }
            };
        };
        if let Err(e) = self.check_session(ctx) {
            return (WireMessage::auth_error(request_id, e.to_string()), false);
        }

        let result = match request.message_type {
            MessageType::Pull => self.handle_pull(ctx, &request).await,
            MessageType::Push => self.handle_push(ctx, &request).await,
            MessageType::Auth => return (WireMessage::error(request_id, "already authenticated"), true),
            other => {
                let reason = format!("unexpected {} from agent", other.as_str());
                return (WireMessage::error(request_id, reason), true);
            }
        };
        match result {
            Ok(reply) => (reply, true),
            Err(e) => {
                warn!(connection_id, agent_id = %ctx.agent_id, kind = request.message_type.as_str(), error = %e, "request failed");
                (WireMessage::error(request_id, e.to_string()), true)
            }
        }
    }
}

/// Per-record admission: origin, payload scope, boundary validation.
fn admit(ctx: &AuthContext, message: &SyncMessage) -> Result<(), String> {
    if message.node_id != ctx.agent_id {
        return Err(format!(
            "origin {} does not match authenticated agent {}",
            message.node_id, ctx.agent_id
        ));
    }
    let scope = Scope::for_payload(&message.payload)
        .ok_or_else(|| format!("{} records are not accepted from agents", message.kind().as_str()))?;
    ctx.claims.require(scope).map_err(|e| e.to_string())?;
    message.validate().map_err(|e| e.to_string())
}
