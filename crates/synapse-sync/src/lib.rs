//! # synapse-sync
//!
//! The agent half of federation. Local writes go through [`SyncEngine`],
//! which stamps each change with a sequence number and clock snapshot and
//! queues it in the persistent change log. A sync pass pulls what the hub
//! has that this agent's clock does not cover, applies it in causal order
//! with per-field CRDT merges, then pushes the pending log.

pub mod delivery;
pub mod engine;
pub mod merge;
pub mod retry;
mod session;
pub mod status;

pub use delivery::{plan_delivery, DeliveryPlan};
pub use engine::SyncEngine;
pub use merge::MergeOutcome;
pub use retry::RetryPolicy;
pub use status::{Credentials, SyncEvent, SyncReport, SyncStatus};
