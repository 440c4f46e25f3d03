use crate::errors::SynapseResult;

/// Text embedding model. Internals are out of scope.
pub trait IEmbeddingProvider: Send + Sync {
    /// Embed a single text into a dense vector.
    fn embed(&self, text: &str) -> SynapseResult<Vec<f32>>;

    /// Dimensionality of produced vectors.
    fn dimensions(&self) -> usize;
}
