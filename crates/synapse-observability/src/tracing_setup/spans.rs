//! Span constructors for the long-running operations.

/// One sync pass on an agent.
#[macro_export]
macro_rules! sync_span {
    ($node_id:expr) => {
        tracing::info_span!("synapse.sync", node_id = %$node_id)
    };
}

/// One served hub connection.
#[macro_export]
macro_rules! connection_span {
    ($connection_id:expr) => {
        tracing::info_span!("synapse.connection", connection_id = $connection_id)
    };
}

/// One certified recall.
#[macro_export]
macro_rules! recall_span {
    ($query_id:expr) => {
        tracing::info_span!("synapse.recall", query_id = %$query_id)
    };
}

pub mod names {
    pub const SYNC: &str = "synapse.sync";
    pub const CONNECTION: &str = "synapse.connection";
    pub const RECALL: &str = "synapse.recall";
}
