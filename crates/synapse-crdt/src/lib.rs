//! # synapse-crdt
//!
//! Causal ordering and conflict-free replicated data types used inside
//! synchronized records.
//!
//! ## Primitives
//!
//! - [`VectorClock`] / [`ClockOrdering`]: causal ordering (`before`, `after`, `concurrent`, `equal`)
//! - [`GCounter`]: grow-only counter (per-node counts, merge = per-node max)
//! - [`LWWRegister`]: last-writer-wins register (timestamp, node id tie-break)
//! - [`ORSet`]: observed-remove set with globally unique add tags
//! - [`WeightedStats`]: per-node outcome sums whose view is the sample-weighted mean
//! - [`EstimateSet`]: per-node revisioned effect estimates, pooled by sample count
//!
//! ## Mathematical Guarantees
//!
//! All merge operations satisfy:
//! 1. **Commutativity**: `merge(A, B) == merge(B, A)`
//! 2. **Associativity**: `merge(A, merge(B, C)) == merge(merge(A, B), C)`
//! 3. **Idempotency**: `merge(A, A) == A`

pub mod clock;
pub mod primitives;

pub use clock::{ClockOrdering, VectorClock};
pub use primitives::{weighted_mean, EstimateSet, GCounter, LWWRegister, NodeSample, NodeEstimate, ORSet, UniqueTag, WeightedStats};
