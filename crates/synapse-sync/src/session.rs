//! One authenticated link to the hub plus the broadcasts it has delivered
//! while the engine was waiting on something else.

use std::time::Duration;

use synapse_core::errors::{AuthError, SynapseResult, TransportError};
use synapse_protocol::{MessageType, SyncMessage, Transport, WireMessage};
use tracing::{debug, trace};

pub(crate) struct Session<T> {
    pub transport: Option<T>,
    /// Unsolicited pushes, merged on the next pass.
    pub inbox: Vec<SyncMessage>,
}

impl<T: Transport> Session<T> {
    pub fn new() -> Self {
        Self {
            transport: None,
            inbox: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Forget the link; the next pass reconnects.
    pub fn drop_transport(&mut self) {
        if self.transport.take().is_some() {
            debug!("dropping hub transport");
        }
    }

    /// Send `request` and wait for the matching `ack`. Broadcasts that arrive
    /// first go to the inbox. An `error` reply becomes a remote transport
    /// error, or an auth error when it answers `auth` or the hub flags it as
    /// ending the session.
    pub async fn request(&mut self, request: WireMessage, timeout: Duration) -> SynapseResult<WireMessage> {
        let transport = self.transport.as_mut().ok_or(TransportError::NotConnected)?;
        transport.send(request.clone()).await?;

        let response = tokio::time::timeout(timeout, await_reply(transport, &mut self.inbox, &request))
            .await
            .map_err(|_| TransportError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            })??;

        match response.message_type {
            MessageType::Ack => Ok(response),
            MessageType::Error => {
                let reason = response.error.unwrap_or_else(|| "unspecified".to_string());
                if response.auth_failed || request.message_type == MessageType::Auth {
                    Err(AuthError::Rejected { reason }.into())
                } else {
                    Err(TransportError::Remote { reason }.into())
                }
            }
            other => Err(TransportError::UnexpectedMessage {
                expected: MessageType::Ack.as_str().to_string(),
                received: other.as_str().to_string(),
            }
            .into()),
        }
    }
}

async fn await_reply<T: Transport>(
    transport: &mut T,
    inbox: &mut Vec<SyncMessage>,
    request: &WireMessage,
) -> SynapseResult<WireMessage> {
    loop {
        let Some(message) = transport.recv().await? else {
            return Err(TransportError::ConnectionClosed.into());
        };
        if message.answers(request) {
            return Ok(message);
        }
        match message.message_type {
            MessageType::Push => {
                let data = message.data.unwrap_or_default();
                trace!(records = data.len(), "broadcast buffered");
                inbox.extend(data);
            }
            MessageType::Error if message.request_id.is_none() => {
                let reason = message.error.unwrap_or_default();
                if message.auth_failed {
                    return Err(AuthError::Rejected { reason }.into());
                }
                return Err(TransportError::Remote { reason }.into());
            }
            other => debug!(kind = other.as_str(), "ignoring uncorrelated message"),
        }
    }
}
