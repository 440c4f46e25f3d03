//! # synapse-protocol
//!
//! Everything that crosses the wire between an agent and the federation hub:
//! the CRDT-backed record types, the [`SyncMessage`] envelope with its tagged
//! [`SyncPayload`], the [`WireMessage`] frame, and the [`Transport`] /
//! [`Connector`] seams the sync engine and hub are written against.

pub mod message;
pub mod records;
pub mod transport;
pub mod wire;

pub use message::{
    ConflictResolutionMetadata, CausalEdgeSync, EpisodeOperation, EpisodeSync,
    ReconciliationRequest, ReconciliationResponse, RecordKind, SkillSync, SyncMessage,
    SyncPayload,
};
pub use records::{CausalEdge, EpisodeContent, EpisodeRecord, SkillOutcome, SkillRecord};
pub use transport::{channel_pair, ChannelTransport, Connector, Transport};
pub use wire::{MessageType, Rejection, WireMessage};
