use std::sync::Arc;

use synapse_core::errors::SynapseResult;
use synapse_protocol::{ChannelTransport, Connector};
use tracing::trace;

use crate::hub::FederationHub;

/// Connects agents to a hub in the same process. Every `connect` gets a
/// fresh connection task, so reconnects behave as on a network.
#[derive(Clone)]
pub struct InProcessConnector {
    hub: Arc<FederationHub>,
}

impl InProcessConnector {
    pub fn new(hub: Arc<FederationHub>) -> Self {
        Self { hub }
    }
}

impl Connector for InProcessConnector {
    type Conn = ChannelTransport;

    async fn connect(&self, endpoint: &str) -> SynapseResult<ChannelTransport> {
        trace!(endpoint, "in-process connect");
        Ok(self.hub.accept())
    }
}
