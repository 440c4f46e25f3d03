//! Collaborator interfaces for components outside this workspace.

mod embedding;
mod vector_index;

pub use embedding::IEmbeddingProvider;
pub use vector_index::{IVectorIndex, VectorHit};
