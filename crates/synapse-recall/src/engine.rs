//! ExplainableRecall: rerank similarity hits by utility and certify the result.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use synapse_causal::CausalMemoryGraph;
use synapse_core::config::RecallConfig;
use synapse_core::errors::{IntegrityError, SynapseError, SynapseResult, ValidationError};
use synapse_core::models::now_ms;
use synapse_core::traits::{IEmbeddingProvider, IVectorIndex};
use synapse_observability::tracing_setup::events;
use synapse_storage::queries::certificate_ops;
use synapse_storage::AgentStore;
use tracing::{debug, info, Instrument};

use crate::certificate::{compute_root, AccessLevel, CertificateChunk, CertificateRequest, RecallCertificate};
use crate::hitting_set;
use crate::scorer::{rank, RankedMemory, UtilityWeights};

/// A recall request. Unset fields fall back to the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecallQuery {
    /// Generated when absent.
    pub query_id: Option<String>,
    pub text: String,
    pub k: Option<usize>,
    pub weights: Option<UtilityWeights>,
    pub requirements: Vec<String>,
    pub access_level: AccessLevel,
}

impl RecallQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    pub fn with_weights(mut self, alpha: f64, beta: f64, gamma: f64) -> Self {
        self.weights = Some(UtilityWeights::new(alpha, beta, gamma));
        self
    }

    pub fn with_requirements<I, S>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements = requirements.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallResult {
    /// Utility descending.
    pub ranked: Vec<RankedMemory>,
    pub certificate: RecallCertificate,
}

/// Certified recall over one agent's store. Uplift comes from the causal
/// graph, candidates from the vector index.
pub struct ExplainableRecall<E, V> {
    store: Arc<AgentStore>,
    causal: Arc<CausalMemoryGraph>,
    embedder: E,
    index: V,
    config: RecallConfig,
}

impl<E: IEmbeddingProvider, V: IVectorIndex> ExplainableRecall<E, V> {
    pub fn new(
        store: Arc<AgentStore>,
        causal: Arc<CausalMemoryGraph>,
        embedder: E,
        index: V,
        config: RecallConfig,
    ) -> Self {
        Self {
            store,
            causal,
            embedder,
            index,
            config,
        }
    }

    pub fn config(&self) -> &RecallConfig {
        &self.config
    }

    pub fn index(&self) -> &V {
        &self.index
    }

    // ── Certificates ────────────────────────────────────────────────────────

    /// Hash the chunks in order, pick the minimal subset satisfying the
    /// requirements and persist the certificate.
    pub async fn create_certificate(&self, request: CertificateRequest) -> SynapseResult<RecallCertificate> {
        if request.query_id.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "certificate.query_id",
            }
            .into());
        }
        let cover = hitting_set::select(&request.chunks, &request.requirements, self.config.hitting_set);
        let certificate = RecallCertificate {
            id: uuid::Uuid::new_v4().to_string(),
            merkle_root: compute_root(&request.chunks),
            minimal_why: cover
                .selected
                .iter()
                .filter_map(|&i| request.chunks.get(i).map(|c| c.id.clone()))
                .collect(),
            unsatisfied: cover.unsatisfied,
            query_id: request.query_id,
            query_text: request.query_text,
            chunks: request.chunks,
            requirements: request.requirements,
            access_level: request.access_level,
            created_at_ms: now_ms(),
        };

        let (row, chunks) = certificate.to_rows();
        self.store
            .with_transaction(|conn| certificate_ops::insert_certificate(conn, &row, &chunks))
            .await?;
        info!(
            certificate_id = %certificate.id,
            chunks = certificate.chunks.len(),
            minimal = certificate.minimal_why.len(),
            unsatisfied = certificate.unsatisfied.len(),
            "certificate issued"
        );
        Ok(certificate)
    }

    /// The stored certificate, chunks as currently stored.
    pub async fn get_certificate(&self, id: &str) -> SynapseResult<RecallCertificate> {
        let (row, chunks) = self.load(id).await?;
        RecallCertificate::from_rows(row, chunks)
    }

    /// Recompute the root from stored chunk content. Any discrepancy is
    /// reported as `false` and logged; only lookup or storage failures are
    /// errors.
    pub async fn verify_certificate(&self, id: &str) -> SynapseResult<bool> {
        match self.ensure_certificate_intact(id).await {
            Ok(()) => Ok(true),
            Err(SynapseError::IntegrityError(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Like [`verify_certificate`](Self::verify_certificate) but surfaces the
    /// mismatch as an [`IntegrityError`].
    pub async fn ensure_certificate_intact(&self, id: &str) -> SynapseResult<()> {
        let (row, chunks) = self.load(id).await?;
        if chunks.len() != row.chunk_count as usize {
            events::certificate_tampered(id, &row.merkle_root, "chunk count changed");
            return Err(IntegrityError::ChunkCountMismatch {
                certificate_id: id.to_string(),
                expected: row.chunk_count as usize,
                found: chunks.len(),
            }
            .into());
        }
        let certificate = RecallCertificate::from_rows(row, chunks)?;
        let computed = certificate.computed_root();
        if computed != certificate.merkle_root {
            events::certificate_tampered(id, &certificate.merkle_root, &computed);
            return Err(IntegrityError::MerkleMismatch {
                certificate_id: id.to_string(),
                recorded: certificate.merkle_root,
                computed,
            }
            .into());
        }
        debug!(certificate_id = id, "certificate verified");
        Ok(())
    }

    async fn load(&self, id: &str) -> SynapseResult<(certificate_ops::CertificateRow, Vec<certificate_ops::ChunkRow>)> {
        self.store
            .with_reader(|conn| {
                let row = certificate_ops::get_certificate(conn, id)?.ok_or_else(|| SynapseError::NotFound {
                    kind: "certificate",
                    id: id.to_string(),
                })?;
                Ok((row, certificate_ops::get_chunks(conn, id)?))
            })
            .await
    }

    // ── Recall ──────────────────────────────────────────────────────────────

    /// Retrieve `k` candidates, join each with its best causal uplift, rank
    /// by utility and certify the ranked set.
    pub async fn recall_with_certificate(&self, query: RecallQuery) -> SynapseResult<RecallResult> {
        let query_id = query
            .query_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let span = synapse_observability::recall_span!(query_id);
        self.recall_inner(query_id, query).instrument(span).await
    }

    async fn recall_inner(&self, query_id: String, query: RecallQuery) -> SynapseResult<RecallResult> {
        let k = query.k.unwrap_or(self.config.default_k);
        let weights = query.weights.unwrap_or_else(|| UtilityWeights::from(&self.config));

        let embedding = self.embedder.embed(&query.text)?;
        let hits = self.index.search(&embedding, k)?;

        let mut scored = Vec::with_capacity(hits.len());
        for hit in hits {
            let uplift = self.causal.best_uplift(&hit.id).await?;
            scored.push(RankedMemory::score(hit, uplift, &weights));
        }
        let ranked = rank(scored);
        debug!(candidates = ranked.len(), k, "reranked by utility");

        let chunks = ranked
            .iter()
            .map(|m| CertificateChunk {
                id: m.id.clone(),
                chunk_type: m.memory_type.clone(),
                content: m.content.clone(),
                relevance: m.utility,
                tags: m.tags.clone(),
            })
            .collect();
        let certificate = self
            .create_certificate(CertificateRequest {
                query_id,
                query_text: query.text,
                chunks,
                requirements: query.requirements,
                access_level: query.access_level,
            })
            .await?;
        Ok(RecallResult { ranked, certificate })
    }
}
