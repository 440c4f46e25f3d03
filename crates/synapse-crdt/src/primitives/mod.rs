//! CRDT primitive data structures used inside synchronized records.

pub mod estimate_set;
pub mod gcounter;
pub mod lww_register;
pub mod or_set;
pub mod weighted_stats;

pub use estimate_set::{EstimateSet, NodeEstimate};
pub use gcounter::GCounter;
pub use lww_register::LWWRegister;
pub use or_set::{ORSet, UniqueTag};
pub use weighted_stats::{weighted_mean, NodeSample, WeightedStats};
