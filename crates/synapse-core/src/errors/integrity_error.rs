/// Tamper or corruption signals. Always surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("merkle root mismatch on certificate {certificate_id}: recorded {recorded}, computed {computed}")]
    MerkleMismatch {
        certificate_id: String,
        recorded: String,
        computed: String,
    },

    #[error("certificate {certificate_id} has {found} stored chunks, expected {expected}")]
    ChunkCountMismatch {
        certificate_id: String,
        expected: usize,
        found: usize,
    },
}
