//! In-process transport over tokio channels. Frames travel as JSON text so
//! the wire encoding is exercised exactly as on a socket.

use synapse_core::errors::{SynapseResult, TransportError};
use tokio::sync::mpsc;
use tracing::trace;

use super::Transport;
use crate::wire::WireMessage;

pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

/// Two connected endpoints.
pub fn channel_pair() -> (ChannelTransport, ChannelTransport) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (
        ChannelTransport { tx: a_tx, rx: a_rx },
        ChannelTransport { tx: b_tx, rx: b_rx },
    )
}

impl Transport for ChannelTransport {
    async fn send(&mut self, message: WireMessage) -> SynapseResult<()> {
        let frame = message.to_json()?;
        trace!(bytes = frame.len(), kind = message.message_type.as_str(), "frame out");
        self.tx
            .send(frame)
            .map_err(|_| TransportError::ConnectionClosed.into())
    }

    async fn recv(&mut self) -> SynapseResult<Option<WireMessage>> {
        match self.rx.recv().await {
            Some(frame) => WireMessage::from_json(&frame).map(Some),
            None => Ok(None),
        }
    }
}
