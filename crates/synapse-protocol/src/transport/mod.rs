//! Transport seams. The byte-level link (WebSocket, HTTP/2, QUIC) lives
//! outside this workspace; anything delivering ordered, reliable frames
//! between two authenticated endpoints can implement [`Transport`].

mod channel;

use std::future::Future;

use synapse_core::errors::SynapseResult;

use crate::wire::WireMessage;

pub use channel::{channel_pair, ChannelTransport};

/// One ordered, reliable, bidirectional message stream.
pub trait Transport: Send + 'static {
    fn send(&mut self, message: WireMessage) -> impl Future<Output = SynapseResult<()>> + Send;

    /// Next inbound message. `Ok(None)` once the peer has closed.
    fn recv(&mut self) -> impl Future<Output = SynapseResult<Option<WireMessage>>> + Send;
}

/// Opens transports to a hub endpoint. Used for the initial connect and for
/// reconnects during retry.
pub trait Connector: Send + Sync + 'static {
    type Conn: Transport;

    fn connect(&self, endpoint: &str) -> impl Future<Output = SynapseResult<Self::Conn>> + Send;
}
