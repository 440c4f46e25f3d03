//! The causal memory graph over one agent store.

use std::sync::Arc;

use rusqlite::Connection;
use synapse_core::config::{CausalConfig, PrunePolicy};
use synapse_core::errors::{CausalError, SynapseError, SynapseResult};
use synapse_core::models::now_ms;
use synapse_crdt::VectorClock;
use synapse_observability::tracing_setup::events;
use synapse_protocol::CausalEdge;
use synapse_storage::queries::{causal_edge_ops, experiment_ops};
use synapse_storage::AgentStore;
use tracing::{debug, info};

use crate::experiment::{Experiment, ExperimentSpec, ExperimentStatus, Observation};
use crate::graph::pruning::{self, PruneResult};
use crate::graph::IndexedGraph;
use crate::query::{rank_effects, EffectFilter};
use crate::traversal::{find_chains, CausalChain};
use crate::uplift::{self, UpliftEstimate};

/// What completing an experiment produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentOutcome {
    pub experiment: Experiment,
    /// `None` when one of the groups never got an observation.
    pub estimate: Option<UpliftEstimate>,
    /// The `treatment -> target` edge written from the estimate, if any.
    pub edge: Option<CausalEdge>,
}

fn require_experiment(conn: &Connection, id: &str) -> SynapseResult<Experiment> {
    experiment_ops::get_experiment(conn, id)?
        .ok_or_else(|| SynapseError::NotFound {
            kind: "experiment",
            id: id.to_string(),
        })?
        .try_into()
}

fn observations(conn: &Connection, experiment_id: &str) -> SynapseResult<Vec<Observation>> {
    Ok(experiment_ops::list_observations(conn, experiment_id)?
        .into_iter()
        .map(Observation::from)
        .collect())
}

/// Causal graph over one agent's store.
pub struct CausalMemoryGraph {
    store: Arc<AgentStore>,
    node_id: String,
    config: CausalConfig,
}

impl CausalMemoryGraph {
    pub fn new(store: Arc<AgentStore>, node_id: impl Into<String>, config: CausalConfig) -> Self {
        Self {
            store,
            node_id: node_id.into(),
            config,
        }
    }

    pub fn config(&self) -> &CausalConfig {
        &self.config
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    // ── Edges ───────────────────────────────────────────────────────────────

    /// Validate and store `edge` under its `(from, to)` key, stamped with the
    /// creator's clock. An edge already stored for the key is superseded:
    /// it keeps its id and creation time, and estimates other nodes
    /// contributed to it survive.
    pub async fn add_causal_edge(&self, mut edge: CausalEdge, creator_clock: &VectorClock) -> SynapseResult<CausalEdge> {
        edge.validate()?;
        edge.version = creator_clock.clone();
        edge.updated_at_ms = edge.updated_at_ms.max(now_ms());
        self.store
            .with_transaction(move |conn| {
                if let Some(stored) = causal_edge_ops::get_edge(conn, &edge.from_memory_id, &edge.to_memory_id)? {
                    edge = edge.superseding(&stored);
                }
                causal_edge_ops::upsert_edge(conn, &edge)?;
                causal_edge_ops::get_edge(conn, &edge.from_memory_id, &edge.to_memory_id)?.ok_or_else(|| {
                    SynapseError::from(CausalError::GraphInconsistency {
                        details: format!("edge {} -> {} vanished after upsert", edge.from_memory_id, edge.to_memory_id),
                    })
                })
            })
            .await
    }

    pub async fn get_edge(&self, from_id: &str, to_id: &str) -> SynapseResult<Option<CausalEdge>> {
        self.store
            .with_reader(|conn| causal_edge_ops::get_edge(conn, from_id, to_id))
            .await
    }

    pub async fn list_edges(&self) -> SynapseResult<Vec<CausalEdge>> {
        self.store.with_reader(causal_edge_ops::list_edges).await
    }

    /// Highest uplift among estimated edges leaving `memory_id`, 0 if none.
    pub async fn best_uplift(&self, memory_id: &str) -> SynapseResult<f64> {
        let edges = self
            .store
            .with_reader(|conn| causal_edge_ops::edges_from(conn, memory_id))
            .await?;
        Ok(edges
            .iter()
            .filter(|e| e.is_rankable())
            .map(|e| e.uplift)
            .reduce(f64::max)
            .unwrap_or(0.0))
    }

    // ── Experiments ─────────────────────────────────────────────────────────

    pub async fn create_experiment(&self, spec: ExperimentSpec) -> SynapseResult<Experiment> {
        spec.validate()?;
        let now = now_ms();
        let experiment = Experiment {
            id: uuid::Uuid::new_v4().to_string(),
            spec,
            status: ExperimentStatus::Running,
            start_time_ms: now,
            end_time_ms: None,
            last_observation_ms: now,
            sample_size: 0,
        };
        let row = experiment.to_row();
        self.store
            .with_writer(|conn| experiment_ops::insert_experiment(conn, &row))
            .await?;
        info!(experiment_id = %experiment.id, treatment = %experiment.spec.treatment_id, "experiment started");
        Ok(experiment)
    }

    pub async fn get_experiment(&self, id: &str) -> SynapseResult<Experiment> {
        self.store.with_reader(|conn| require_experiment(conn, id)).await
    }

    pub async fn list_experiments(&self, status: Option<ExperimentStatus>) -> SynapseResult<Vec<Experiment>> {
        let rows = self
            .store
            .with_reader(|conn| experiment_ops::list_experiments(conn, status.map(|s| s.as_str())))
            .await?;
        rows.into_iter().map(Experiment::try_from).collect()
    }

    /// Append an observation to a running experiment.
    pub async fn record_observation(&self, observation: Observation) -> SynapseResult<Experiment> {
        observation.validate()?;
        let row = observation.to_row(now_ms());
        self.store
            .with_transaction(move |conn| {
                let experiment = require_experiment(conn, &row.experiment_id)?;
                if !experiment.is_running() {
                    return Err(CausalError::ExperimentCompleted {
                        experiment_id: experiment.id,
                    }
                    .into());
                }
                experiment_ops::insert_observation(conn, &row)?;
                require_experiment(conn, &row.experiment_id)
            })
            .await
    }

    pub async fn observations(&self, experiment_id: &str) -> SynapseResult<Vec<Observation>> {
        self.store
            .with_reader(|conn| {
                require_experiment(conn, experiment_id)?;
                observations(conn, experiment_id)
            })
            .await
    }

    pub async fn calculate_uplift(&self, experiment_id: &str) -> SynapseResult<UpliftEstimate> {
        let observations = self.observations(experiment_id).await?;
        Ok(uplift::estimate(
            experiment_id,
            &observations,
            &self.config.confidence_curve,
            self.config.min_reliable_samples,
        )?)
    }

    /// Close the experiment. With a target and observations in both groups,
    /// the estimate is written as the edge `treatment -> target`, stamped
    /// with `creator_clock` and superseding any edge already stored for that
    /// pair.
    pub async fn complete_experiment(
        &self,
        experiment_id: &str,
        creator_clock: &VectorClock,
    ) -> SynapseResult<ExperimentOutcome> {
        let now = now_ms();
        self.store
            .with_transaction(|conn| self.complete_in(conn, experiment_id, now, creator_clock))
            .await
    }

    /// Complete every running experiment whose last observation is older
    /// than the idle window.
    pub async fn complete_idle_experiments(
        &self,
        now_ms: i64,
        creator_clock: &VectorClock,
    ) -> SynapseResult<Vec<ExperimentOutcome>> {
        let window_ms = i64::try_from(self.config.experiment_idle_window_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        let cutoff = now_ms.saturating_sub(window_ms);
        let outcomes = self
            .store
            .with_transaction(|conn| {
                experiment_ops::idle_running_experiments(conn, cutoff)?
                    .iter()
                    .map(|id| self.complete_in(conn, id, now_ms, creator_clock))
                    .collect::<SynapseResult<Vec<_>>>()
            })
            .await?;
        if !outcomes.is_empty() {
            info!(completed = outcomes.len(), cutoff_ms = cutoff, "auto-completed idle experiments");
        }
        Ok(outcomes)
    }

    fn complete_in(
        &self,
        conn: &Connection,
        experiment_id: &str,
        now: i64,
        creator_clock: &VectorClock,
    ) -> SynapseResult<ExperimentOutcome> {
        let experiment = require_experiment(conn, experiment_id)?;
        if !experiment.is_running() {
            return Err(CausalError::ExperimentCompleted {
                experiment_id: experiment.id,
            }
            .into());
        }
        experiment_ops::complete_experiment(conn, experiment_id, now)?;

        let observed = observations(conn, experiment_id)?;
        let estimate = uplift::estimate(
            experiment_id,
            &observed,
            &self.config.confidence_curve,
            self.config.min_reliable_samples,
        )
        .ok();

        let edge = match (&estimate, &experiment.spec.target_memory_id) {
            (Some(estimate), Some(target_id)) => {
                let spec = &experiment.spec;
                let target_type = spec.target_memory_type.as_deref().unwrap_or("episode");
                let previous = causal_edge_ops::get_edge(conn, &spec.treatment_id, target_id)?;
                let similarity = previous.as_ref().map_or(0.0, |e| e.similarity);
                let mut edge = CausalEdge::new(
                    (spec.treatment_id.as_str(), spec.treatment_type.as_str()),
                    (target_id.as_str(), target_type),
                    similarity,
                    &self.node_id,
                    now,
                )
                .with_estimate(estimate.uplift, estimate.confidence, estimate.sample_size())
                .with_evidence(observed.iter().map(|o| o.episode_id.clone()));
                edge.version = creator_clock.clone();
                if let Some(previous) = previous {
                    edge = edge.superseding(&previous);
                }
                edge.validate()?;
                causal_edge_ops::upsert_edge(conn, &edge)?;
                causal_edge_ops::get_edge(conn, &spec.treatment_id, target_id)?
            }
            _ => None,
        };

        let experiment = require_experiment(conn, experiment_id)?;
        debug!(
            experiment_id,
            uplift = estimate.map(|e| e.uplift),
            edge_written = edge.is_some(),
            "experiment completed"
        );
        Ok(ExperimentOutcome {
            experiment,
            estimate,
            edge,
        })
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    /// Estimated edges matching `filter`, by uplift then confidence, both
    /// descending.
    pub async fn query_causal_effects(&self, filter: &EffectFilter) -> SynapseResult<Vec<CausalEdge>> {
        let edges = self
            .store
            .with_reader(|conn| match &filter.intervention_memory_id {
                Some(id) => causal_edge_ops::edges_from(conn, id),
                None => causal_edge_ops::list_edges(conn),
            })
            .await?;
        Ok(rank_effects(edges, filter))
    }

    /// Simple paths `from_id -> ... -> to_id` of at most `max_depth` edges.
    /// The depth is capped at the configured `max_chain_depth`.
    pub async fn get_causal_chain(&self, from_id: &str, to_id: &str, max_depth: usize) -> SynapseResult<Vec<CausalChain>> {
        let graph = self.load_graph().await?;
        let depth = max_depth.min(self.config.max_chain_depth);
        let chains = find_chains(&graph, from_id, to_id, depth);
        debug!(from_id, to_id, depth, found = chains.len(), "causal chain search");
        Ok(chains)
    }

    pub async fn load_graph(&self) -> SynapseResult<IndexedGraph> {
        Ok(IndexedGraph::from_edges(self.list_edges().await?))
    }

    // ── Maintenance ─────────────────────────────────────────────────────────

    pub async fn prune(&self, policy: &PrunePolicy) -> SynapseResult<PruneResult> {
        self.prune_at(policy, now_ms()).await
    }

    /// Prune with the configured policy.
    pub async fn prune_default(&self) -> SynapseResult<PruneResult> {
        self.prune(&self.config.prune).await
    }

    pub async fn prune_at(&self, policy: &PrunePolicy, now_ms: i64) -> SynapseResult<PruneResult> {
        let result = self
            .store
            .with_transaction(|conn| pruning::prune(conn, policy, now_ms))
            .await?;
        events::edges_pruned(result.edges_removed, policy.min_confidence, policy.min_sample_size);
        Ok(result)
    }
}
