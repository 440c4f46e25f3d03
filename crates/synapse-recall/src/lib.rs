//! # synapse-recall
//!
//! Explainable recall. Similarity candidates from an external vector index
//! are reranked by `alpha * similarity + beta * uplift - gamma * latency`,
//! with uplift joined from the causal graph. The result is wrapped in a
//! certificate: a Merkle root over the ordered chunk contents plus the
//! smallest chunk subset that satisfies the caller's requirements.

pub mod certificate;
pub mod engine;
pub mod hitting_set;
pub mod merkle;
pub mod scorer;

pub use certificate::{AccessLevel, CertificateChunk, CertificateRequest, RecallCertificate};
pub use engine::{ExplainableRecall, RecallQuery, RecallResult};
pub use hitting_set::Cover;
pub use merkle::MerkleProof;
pub use scorer::{RankedMemory, UtilityWeights};
