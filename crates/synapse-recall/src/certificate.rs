//! Provenance certificates: a recall result pinned by a Merkle root.

use serde::{Deserialize, Serialize};
use synapse_core::errors::{StorageError, SynapseError, SynapseResult};
use synapse_storage::queries::certificate_ops::{CertificateRow, ChunkRow};

use crate::merkle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Public,
    #[default]
    Internal,
    Restricted,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Restricted => "restricted",
        }
    }

    fn parse(raw: &str) -> SynapseResult<Self> {
        match raw {
            "public" => Ok(Self::Public),
            "internal" => Ok(Self::Internal),
            "restricted" => Ok(Self::Restricted),
            other => Err(StorageError::CorruptRow {
                details: format!("unknown access level '{other}'"),
            }
            .into()),
        }
    }
}

/// One piece of retrieved content, a leaf of the certificate's tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateChunk {
    pub id: String,
    #[serde(rename = "type")]
    pub chunk_type: String,
    pub content: String,
    pub relevance: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CertificateChunk {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            chunk_type: "episode".to_string(),
            content: content.into(),
            relevance: 0.0,
            tags: Vec::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = relevance;
        self
    }

    pub fn leaf_hash(&self) -> blake3::Hash {
        merkle::leaf_hash(self.content.as_bytes())
    }

    fn to_row(&self, position: usize) -> ChunkRow {
        ChunkRow {
            position: position as u32,
            chunk_id: self.id.clone(),
            chunk_type: self.chunk_type.clone(),
            content: self.content.clone(),
            relevance: self.relevance,
            tags: self.tags.clone(),
        }
    }
}

impl From<ChunkRow> for CertificateChunk {
    fn from(row: ChunkRow) -> Self {
        Self {
            id: row.chunk_id,
            chunk_type: row.chunk_type,
            content: row.content,
            relevance: row.relevance,
            tags: row.tags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequest {
    pub query_id: String,
    pub query_text: String,
    /// Leaf order is the order given here.
    pub chunks: Vec<CertificateChunk>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub access_level: AccessLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallCertificate {
    pub id: String,
    pub query_id: String,
    pub query_text: String,
    /// Hex-encoded root over `chunks` in order.
    pub merkle_root: String,
    pub chunks: Vec<CertificateChunk>,
    pub requirements: Vec<String>,
    /// Ids of the smallest chunk subset satisfying the requirements.
    pub minimal_why: Vec<String>,
    pub unsatisfied: Vec<String>,
    pub access_level: AccessLevel,
    pub created_at_ms: i64,
}

impl RecallCertificate {
    /// Root recomputed from the chunks this value holds.
    pub fn computed_root(&self) -> String {
        compute_root(&self.chunks)
    }

    /// True when every requirement was satisfied by some chunk.
    pub fn is_complete(&self) -> bool {
        self.unsatisfied.is_empty()
    }

    /// Inclusion proof for the chunk with `chunk_id`.
    pub fn proof_for(&self, chunk_id: &str) -> Option<merkle::MerkleProof> {
        let index = self.chunks.iter().position(|c| c.id == chunk_id)?;
        let leaves: Vec<blake3::Hash> = self.chunks.iter().map(CertificateChunk::leaf_hash).collect();
        merkle::prove(&leaves, index)
    }

    pub(crate) fn to_rows(&self) -> (CertificateRow, Vec<ChunkRow>) {
        let cert = CertificateRow {
            id: self.id.clone(),
            query_id: self.query_id.clone(),
            query_text: self.query_text.clone(),
            requirements: self.requirements.clone(),
            minimal_why: self.minimal_why.clone(),
            unsatisfied: self.unsatisfied.clone(),
            merkle_root: self.merkle_root.clone(),
            access_level: self.access_level.as_str().to_string(),
            chunk_count: self.chunks.len() as u32,
            created_at_ms: self.created_at_ms,
        };
        let chunks = self.chunks.iter().enumerate().map(|(i, c)| c.to_row(i)).collect();
        (cert, chunks)
    }

    pub(crate) fn from_rows(cert: CertificateRow, chunks: Vec<ChunkRow>) -> Result<Self, SynapseError> {
        Ok(Self {
            access_level: AccessLevel::parse(&cert.access_level)?,
            id: cert.id,
            query_id: cert.query_id,
            query_text: cert.query_text,
            merkle_root: cert.merkle_root,
            chunks: chunks.into_iter().map(CertificateChunk::from).collect(),
            requirements: cert.requirements,
            minimal_why: cert.minimal_why,
            unsatisfied: cert.unsatisfied,
            created_at_ms: cert.created_at_ms,
        })
    }
}

pub fn compute_root(chunks: &[CertificateChunk]) -> String {
    merkle::merkle_root(chunks.iter().map(|c| c.content.as_bytes()))
        .to_hex()
        .to_string()
}
