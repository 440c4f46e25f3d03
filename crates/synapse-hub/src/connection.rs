//! Per-connection task.
//!
//! Messages from one connection are handled strictly in arrival order. The
//! task also drains the session's outbox (broadcasts from co-tenant pushes)
//! and closes the link after `idle_timeout` without inbound traffic, or once
//! the session's token has expired.

use std::sync::Arc;

use synapse_core::errors::SynapseResult;
use synapse_protocol::{Transport, WireMessage};
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn, Instrument};

use crate::hub::{AuthContext, FederationHub, OUTBOX_CAPACITY};
use crate::registry::ConnectionId;

enum Event {
    Inbound(SynapseResult<Option<WireMessage>>),
    Broadcast(WireMessage),
    Idle,
}

/// Serve one agent connection until it closes, fails auth, or goes idle.
pub async fn serve_connection<T: Transport>(hub: Arc<FederationHub>, transport: T) {
    let connection_id = hub.registry().next_connection_id();
    hub.metrics().connection_accepted();
    let span = synapse_observability::connection_span!(connection_id);
    run(hub, transport, connection_id).instrument(span).await;
}

async fn run<T: Transport>(hub: Arc<FederationHub>, mut transport: T, connection_id: ConnectionId) {
    let (outbox, mut broadcasts) = mpsc::channel(OUTBOX_CAPACITY);
    let mut session: Option<AuthContext> = None;
    let idle_timeout = hub.config().idle_timeout();
    let idle = sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        let event = tokio::select! {
            inbound = transport.recv() => Event::Inbound(inbound),
            Some(message) = broadcasts.recv() => Event::Broadcast(message),
            () = &mut idle => Event::Idle,
        };
        match event {
            Event::Inbound(Ok(Some(request))) => {
                idle.as_mut().reset(Instant::now() + idle_timeout);
                let (reply, keep_open) = hub.dispatch(connection_id, &mut session, &outbox, request).await;
                if transport.send(reply).await.is_err() || !keep_open {
                    break;
                }
            }
            Event::Inbound(Ok(None)) => {
                debug!("agent closed the connection");
                break;
            }
            Event::Inbound(Err(e)) => {
                warn!(error = %e, "dropping connection after unreadable frame");
                break;
            }
            Event::Broadcast(message) => {
                if let Some(Err(e)) = session.as_ref().map(|ctx| hub.check_session(ctx)) {
                    let _ = transport.send(WireMessage::auth_error(None, e.to_string())).await;
                    break;
                }
                if transport.send(message).await.is_err() {
                    break;
                }
            }
            Event::Idle => {
                hub.metrics().idle_disconnect();
                info!(idle_secs = idle_timeout.as_secs(), "closing idle connection");
                break;
            }
        }
    }

    if let Some(ctx) = session {
        hub.registry().remove(connection_id);
        info!(agent_id = %ctx.agent_id, tenant_id = %ctx.tenant_id, "agent disconnected");
    }
}
