//! The agent sync engine: local change recording, pull, merge, push and retry.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::Connection;
use synapse_core::config::SyncConfig;
use synapse_core::errors::{AuthError, ConfigError, StorageError, SynapseError, SynapseResult, TransportError};
use synapse_core::models::now_ms;
use synapse_crdt::VectorClock;
use synapse_observability::tracing_setup::events;
use synapse_observability::{DegradationTracker, SyncMetrics, TrackedDegradation};
use synapse_protocol::{
    CausalEdge, CausalEdgeSync, Connector, EpisodeContent, EpisodeOperation, EpisodeRecord, EpisodeSync,
    ReconciliationRequest, SkillOutcome, SkillRecord, SkillSync, SyncMessage, SyncPayload, WireMessage,
};
use synapse_storage::queries::pending_ops::{self, RejectedChange};
use synapse_storage::queries::{causal_edge_ops, episode_ops, skill_ops, sync_state_ops};
use synapse_storage::AgentStore;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn, Instrument};

use crate::delivery::plan_delivery;
use crate::merge::{self, MergeOutcome};
use crate::retry::RetryPolicy;
use crate::session::Session;
use crate::status::{Credentials, SyncEvent, SyncReport, SyncStatus};

const SYNC_COMPONENT: &str = "sync";

/// Identity and clock for one local change, handed to the payload builder.
struct Stamp<'a> {
    node_id: &'a str,
    clock: &'a VectorClock,
    now_ms: i64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn missing_sync_state() -> SynapseError {
    StorageError::CorruptRow {
        details: "sync_state row missing".to_string(),
    }
    .into()
}

fn load_clock(conn: &Connection) -> SynapseResult<VectorClock> {
    Ok(sync_state_ops::load_sync_state(conn)?
        .ok_or_else(missing_sync_state)?
        .vector_clock)
}

/// The agent side of federation. Owns this agent's clock and change log.
///
/// All methods take `&self`; share the engine through an `Arc` to record
/// changes while [`run`](Self::run) drives periodic syncs.
pub struct SyncEngine<C: Connector> {
    connector: C,
    endpoint: String,
    node_id: String,
    credentials: Mutex<Credentials>,
    store: Arc<AgentStore>,
    config: SyncConfig,
    retry: RetryPolicy,
    session: tokio::sync::Mutex<Session<C::Conn>>,
    status: watch::Sender<SyncStatus>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SyncEvent>>>,
    metrics: Arc<SyncMetrics>,
    degradation: Mutex<DegradationTracker>,
}

impl<C: Connector> SyncEngine<C> {
    /// Prepare the engine for `credentials.agent_id`, which is also the node
    /// id stamped on every local change. No connection is made yet.
    pub async fn new(
        connector: C,
        credentials: Credentials,
        store: Arc<AgentStore>,
        config: SyncConfig,
    ) -> SynapseResult<Self> {
        let endpoint = config
            .hub_endpoint
            .clone()
            .ok_or_else(|| ConfigError::ValidationFailed {
                field: "sync.hub_endpoint".to_string(),
                message: "required to sync".to_string(),
            })?;
        let node_id = credentials.agent_id.clone();

        let init_node = node_id.clone();
        let state = store
            .with_transaction(move |conn| {
                sync_state_ops::init_sync_state(conn, &init_node)?;
                sync_state_ops::load_sync_state(conn)?.ok_or_else(missing_sync_state)
            })
            .await?;
        if state.node_id != node_id {
            warn!(stored = %state.node_id, node_id = %node_id, "store was created by another node id");
        }

        let (status, _) = watch::channel(SyncStatus::Disconnected);
        Ok(Self {
            connector,
            endpoint,
            node_id,
            credentials: Mutex::new(credentials),
            store,
            retry: RetryPolicy::from_config(&config),
            config,
            session: tokio::sync::Mutex::new(Session::new()),
            status,
            subscribers: Mutex::new(Vec::new()),
            metrics: Arc::new(SyncMetrics::new()),
            degradation: Mutex::new(DegradationTracker::new()),
        })
    }

    /// Replace the retry policy (tests use millisecond backoff).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Watch status transitions.
    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Receive every [`SyncEvent`] emitted from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SyncEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    pub fn metrics(&self) -> Arc<SyncMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn degradation_history(&self) -> Vec<TrackedDegradation> {
        lock(&self.degradation).events().to_vec()
    }

    pub fn store(&self) -> &Arc<AgentStore> {
        &self.store
    }

    pub async fn clock(&self) -> SynapseResult<VectorClock> {
        self.store.with_reader(load_clock).await
    }

    pub async fn pending_count(&self) -> SynapseResult<u64> {
        self.store.with_reader(pending_ops::pending_count).await
    }

    pub async fn rejected_changes(&self) -> SynapseResult<Vec<RejectedChange>> {
        self.store.with_reader(pending_ops::rejected_changes).await
    }

    /// Install a fresh token after [`SyncStatus::ReauthRequired`]. The next
    /// sync reconnects with it.
    pub async fn update_token(&self, token: impl Into<String>) {
        lock(&self.credentials).token = token.into();
        self.session.lock().await.drop_transport();
        self.set_status(SyncStatus::Disconnected);
    }

    // ─── Connection ─────────────────────────────────────────────────────────

    /// Open a transport and authenticate. Ensures this node has an entry in
    /// the local clock.
    pub async fn connect(&self) -> SynapseResult<()> {
        let mut session = self.session.lock().await;
        self.connect_locked(&mut session).await
    }

    pub async fn disconnect(&self) {
        self.session.lock().await.drop_transport();
        self.set_status(SyncStatus::Disconnected);
        info!(node_id = %self.node_id, "disconnected from hub");
    }

    async fn connect_locked(&self, session: &mut Session<C::Conn>) -> SynapseResult<()> {
        self.set_status(SyncStatus::Authenticating);
        let transport = match self.connector.connect(&self.endpoint).await {
            Ok(transport) => transport,
            Err(e) => {
                self.set_status(SyncStatus::Disconnected);
                return Err(e);
            }
        };
        session.transport = Some(transport);

        let credentials = lock(&self.credentials).clone();
        let auth = WireMessage::auth(&credentials.agent_id, &credentials.tenant_id, &credentials.token);
        if let Err(e) = session.request(auth, self.config.request_timeout()).await {
            session.drop_transport();
            if e.is_fatal_auth() {
                self.set_status(SyncStatus::ReauthRequired);
                self.emit(SyncEvent::AuthFailed { reason: e.to_string() });
            } else {
                self.set_status(SyncStatus::Disconnected);
            }
            return Err(e);
        }

        let node_id = self.node_id.clone();
        self.store
            .with_transaction(move |conn| {
                let mut clock = load_clock(conn)?;
                clock.ensure(&node_id);
                sync_state_ops::save_clock(conn, &clock)
            })
            .await?;
        self.set_status(SyncStatus::Connected);
        info!(node_id = %self.node_id, endpoint = %self.endpoint, "connected to hub");
        Ok(())
    }

    // ─── Local changes ──────────────────────────────────────────────────────

    /// Record a new episode and queue it for push.
    pub async fn record_episode(&self, content: EpisodeContent, tags: &[&str]) -> SynapseResult<EpisodeRecord> {
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        self.record_local(move |conn, stamp| {
            let mut episode = EpisodeRecord::new(EpisodeRecord::generate_id(), content, stamp.node_id, stamp.now_ms);
            for tag in tags {
                episode.add_tag(tag, stamp.node_id);
            }
            episode.validate()?;
            episode_ops::upsert_episode(conn, &episode)?;
            Ok((episode_payload(EpisodeOperation::Create, &episode), episode))
        })
        .await
    }

    pub async fn update_episode(&self, id: &str, content: EpisodeContent) -> SynapseResult<EpisodeRecord> {
        let id = id.to_string();
        self.record_local(move |conn, stamp| {
            let mut episode = require_episode(conn, &id)?;
            let ts = stamp.now_ms.max(episode.content.timestamp() + 1);
            episode.update_content(content, stamp.node_id, ts);
            episode.validate()?;
            episode_ops::upsert_episode(conn, &episode)?;
            Ok((episode_payload(EpisodeOperation::Update, &episode), episode))
        })
        .await
    }

    pub async fn tag_episode(&self, id: &str, tag: &str) -> SynapseResult<EpisodeRecord> {
        let (id, tag) = (id.to_string(), tag.to_string());
        self.record_local(move |conn, stamp| {
            let mut episode = require_episode(conn, &id)?;
            episode.add_tag(tag, stamp.node_id);
            episode_ops::upsert_episode(conn, &episode)?;
            Ok((episode_payload(EpisodeOperation::Update, &episode), episode))
        })
        .await
    }

    pub async fn untag_episode(&self, id: &str, tag: &str) -> SynapseResult<EpisodeRecord> {
        let (id, tag) = (id.to_string(), tag.to_string());
        self.record_local(move |conn, _stamp| {
            let mut episode = require_episode(conn, &id)?;
            episode.remove_tag(&tag);
            episode_ops::upsert_episode(conn, &episode)?;
            Ok((episode_payload(EpisodeOperation::Update, &episode), episode))
        })
        .await
    }

    /// Tombstone an episode. The row stays so the delete can win merges.
    pub async fn delete_episode(&self, id: &str) -> SynapseResult<EpisodeRecord> {
        let id = id.to_string();
        self.record_local(move |conn, stamp| {
            let mut episode = require_episode(conn, &id)?;
            let ts = stamp.now_ms.max(episode.deleted.timestamp() + 1);
            episode.tombstone(stamp.node_id, ts);
            episode_ops::upsert_episode(conn, &episode)?;
            Ok((episode_payload(EpisodeOperation::Delete, &episode), episode))
        })
        .await
    }

    pub async fn get_episode(&self, id: &str) -> SynapseResult<Option<EpisodeRecord>> {
        let id = id.to_string();
        self.store.with_reader(move |conn| episode_ops::get_episode(conn, &id)).await
    }

    pub async fn list_episodes(&self) -> SynapseResult<Vec<EpisodeRecord>> {
        self.store
            .with_reader(|conn| episode_ops::list_episodes(conn, false))
            .await
    }

    /// Count one use of a skill, creating it with `name`/`description` if new.
    pub async fn record_skill_use(
        &self,
        skill_id: &str,
        name: &str,
        description: &str,
        outcome: SkillOutcome,
    ) -> SynapseResult<SkillRecord> {
        let (skill_id, name, description) = (skill_id.to_string(), name.to_string(), description.to_string());
        self.record_local(move |conn, stamp| {
            let mut skill = match skill_ops::get_skill(conn, &skill_id)? {
                Some(existing) => existing,
                None => SkillRecord::new(&skill_id, name, description, stamp.node_id, stamp.now_ms),
            };
            skill.record_use(stamp.node_id, &outcome);
            skill.validate()?;
            skill_ops::upsert_skill(conn, &skill, stamp.now_ms)?;
            Ok((SyncPayload::Skill(SkillSync { skill: skill.clone() }), skill))
        })
        .await
    }

    pub async fn link_skill_episode(&self, skill_id: &str, episode_id: &str) -> SynapseResult<SkillRecord> {
        let (skill_id, episode_id) = (skill_id.to_string(), episode_id.to_string());
        self.record_local(move |conn, stamp| {
            let mut skill = skill_ops::get_skill(conn, &skill_id)?.ok_or_else(|| SynapseError::NotFound {
                kind: "skill",
                id: skill_id.clone(),
            })?;
            skill.link_episode(episode_id, stamp.node_id);
            skill_ops::upsert_skill(conn, &skill, stamp.now_ms)?;
            Ok((SyncPayload::Skill(SkillSync { skill: skill.clone() }), skill))
        })
        .await
    }

    pub async fn get_skill(&self, skill_id: &str) -> SynapseResult<Option<SkillRecord>> {
        let skill_id = skill_id.to_string();
        self.store.with_reader(move |conn| skill_ops::get_skill(conn, &skill_id)).await
    }

    /// Store `edge` locally as this node's estimate, stamped with this
    /// node's clock, and queue it for push. An edge already stored for the
    /// pair is superseded, keeping what other nodes contributed.
    pub async fn share_causal_edge(&self, edge: CausalEdge) -> SynapseResult<CausalEdge> {
        edge.validate()?;
        self.record_local(move |conn, stamp| {
            let mut edge = edge.attributed_to(stamp.node_id);
            edge.version = stamp.clock.clone();
            edge.updated_at_ms = stamp.now_ms;
            if let Some(stored) = causal_edge_ops::get_edge(conn, &edge.from_memory_id, &edge.to_memory_id)? {
                edge = edge.superseding(&stored);
            }
            causal_edge_ops::upsert_edge(conn, &edge)?;
            Ok((SyncPayload::CausalEdge(CausalEdgeSync::from_edge(edge.clone())), edge))
        })
        .await
    }

    /// Apply a local change: bump this node's clock, allocate a sequence
    /// number, let `build` write the record, and append the resulting
    /// message to the pending log. All in one transaction.
    async fn record_local<F, T>(&self, build: F) -> SynapseResult<T>
    where
        F: FnOnce(&Connection, &Stamp<'_>) -> SynapseResult<(SyncPayload, T)> + Send,
        T: Send,
    {
        let node_id = self.node_id.clone();
        let (message, value) = self
            .store
            .with_transaction(move |conn| {
                let clock = load_clock(conn)?.incremented(&node_id);
                let sequence_number = sync_state_ops::allocate_sequence(conn)?;
                let now = now_ms();
                let stamp = Stamp {
                    node_id: &node_id,
                    clock: &clock,
                    now_ms: now,
                };
                let (payload, value) = build(conn, &stamp)?;
                sync_state_ops::save_clock(conn, &clock)?;
                let message = SyncMessage {
                    sequence_number,
                    timestamp_ms: now,
                    node_id: node_id.clone(),
                    vector_clock: clock,
                    payload,
                };
                pending_ops::insert_pending(conn, &message)?;
                Ok((message, value))
            })
            .await?;
        debug!(
            seq = message.sequence_number,
            kind = message.kind().as_str(),
            record_id = %message.record_id(),
            clock = %message.vector_clock,
            "recorded local change"
        );
        Ok(value)
    }

    // ─── Sync ───────────────────────────────────────────────────────────────

    /// One pull → merge → push pass. Connects first if needed. Transport
    /// failures drop the link so the next attempt reconnects.
    pub async fn sync(&self) -> SynapseResult<SyncReport> {
        let mut session = self.session.lock().await;
        if self.status() == SyncStatus::ReauthRequired {
            return Err(AuthError::Rejected {
                reason: "re-authentication required".to_string(),
            }
            .into());
        }
        if !session.is_connected() {
            self.connect_locked(&mut session).await?;
        }

        self.set_status(SyncStatus::Syncing);
        let span = synapse_observability::sync_span!(self.node_id);
        let result = self.sync_pass(&mut session).instrument(span).await;
        match &result {
            Ok(report) => {
                self.set_status(SyncStatus::Connected);
                events::sync_completed(&self.node_id, report.pulled, report.applied, report.pushed, report.conflicts);
                self.emit(SyncEvent::SyncCompleted(report.clone()));
            }
            Err(e) => {
                session.drop_transport();
                if e.is_fatal_auth() {
                    self.set_status(SyncStatus::ReauthRequired);
                    self.emit(SyncEvent::AuthFailed { reason: e.to_string() });
                } else {
                    self.set_status(SyncStatus::Disconnected);
                }
            }
        }
        result
    }

    async fn sync_pass(&self, session: &mut Session<C::Conn>) -> SynapseResult<SyncReport> {
        let mut report = self.pull_and_merge(session).await?;
        let (pushed, rejected) = self.push_pending(session).await?;
        report.pushed = pushed;
        report.rejected = rejected;
        self.store
            .with_writer(|conn| sync_state_ops::mark_synced(conn, now_ms()))
            .await?;
        Ok(report)
    }

    async fn pull_and_merge(&self, session: &mut Session<C::Conn>) -> SynapseResult<SyncReport> {
        let mut report = SyncReport::default();
        let mut cursor = None;
        loop {
            let local = self.clock().await?;
            let request = WireMessage::pull(&local).with_cursor(cursor);
            let response = session.request(request, self.config.request_timeout()).await?;
            let has_more = response.has_more.unwrap_or(false);
            let advanced = response.cursor > cursor;
            cursor = response.cursor;
            let mut batch = response.data.unwrap_or_default();
            report.pulled += batch.len();
            self.metrics.pulled(batch.len());

            // Broadcasts join the last page, when the pull has seen everything.
            let settled = if has_more {
                None
            } else {
                batch.append(&mut session.inbox);
                response.vector_clock
            };
            let page = self.deliver(batch, settled).await?;
            let progressed = page.applied + page.invalid > 0;
            report.absorb(&page);
            if !has_more || !(progressed || advanced) {
                break;
            }
        }
        Ok(report)
    }

    /// Plan and apply `batch` in one transaction.
    async fn deliver(&self, batch: Vec<SyncMessage>, settled: Option<VectorClock>) -> SynapseResult<SyncReport> {
        if batch.is_empty() {
            return Ok(SyncReport::default());
        }
        let report = self
            .store
            .with_transaction(move |conn| {
                let local = load_clock(conn)?;
                let plan = plan_delivery(batch, &local, settled.as_ref());
                let mut report = SyncReport {
                    duplicates: plan.duplicates,
                    deferred: plan.deferred.len(),
                    ..Default::default()
                };
                let now = now_ms();
                for (message, ordering) in &plan.ready {
                    if let Err(e) = message.validate() {
                        warn!(record_id = %message.record_id(), origin = %message.node_id, error = %e, "skipping invalid remote record");
                        report.invalid += 1;
                        continue;
                    }
                    match merge::apply_remote(conn, message, *ordering, now)? {
                        MergeOutcome::Merged => {
                            report.applied += 1;
                            report.conflicts += 1;
                        }
                        MergeOutcome::Inserted | MergeOutcome::Replaced => report.applied += 1,
                        MergeOutcome::Ignored => {}
                    }
                }
                if plan.clock != local {
                    sync_state_ops::save_clock(conn, &plan.clock)?;
                }
                Ok(report)
            })
            .await?;
        self.metrics.applied(report.applied, report.conflicts, report.duplicates);
        Ok(report)
    }

    async fn push_pending(&self, session: &mut Session<C::Conn>) -> SynapseResult<(usize, usize)> {
        let batch_size = self.config.push_batch_size.max(1);
        let (mut pushed, mut rejected_total) = (0, 0);
        loop {
            let batch = self
                .store
                .with_writer(move |conn| pending_ops::pending_batch(conn, batch_size))
                .await?;
            if batch.is_empty() {
                break;
            }
            let sequence_numbers: Vec<u64> = batch.iter().map(|m| m.sequence_number).collect();
            let local = self.clock().await?;

            let response = match session
                .request(WireMessage::push(&local, batch), self.config.request_timeout())
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    let reason = e.to_string();
                    self.store
                        .with_writer(move |conn| pending_ops::record_attempt(conn, &sequence_numbers, &reason))
                        .await?;
                    return Err(e);
                }
            };

            let accepted = response.accepted.unwrap_or_default();
            let rejected = response.rejected.unwrap_or_default();
            for rejection in &rejected {
                warn!(seq = rejection.sequence_number, reason = %rejection.reason, "hub rejected change");
            }
            let (n_accepted, n_rejected) = (accepted.len(), rejected.len());
            self.store
                .with_transaction(move |conn| {
                    pending_ops::mark_acked(conn, &accepted, now_ms())?;
                    for rejection in &rejected {
                        pending_ops::mark_rejected(conn, rejection.sequence_number, &rejection.reason)?;
                    }
                    Ok(())
                })
                .await?;
            pushed += n_accepted;
            rejected_total += n_rejected;
            self.metrics.pushed(n_accepted, n_rejected);
            if n_accepted + n_rejected == 0 {
                warn!("push acknowledged nothing; leaving remaining changes pending");
                break;
            }
        }
        Ok((pushed, rejected_total))
    }

    /// [`sync`](Self::sync) with truncated exponential backoff on transport
    /// failures. Auth failures are returned immediately. After the last
    /// attempt the status goes `Offline` and a `PersistentFailure` event is
    /// emitted; pending changes stay queued.
    pub async fn sync_with_retry(&self) -> SynapseResult<SyncReport> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.metrics.attempt();
            match self.sync().await {
                Ok(report) => {
                    self.metrics.success();
                    if lock(&self.degradation).mark_recovered(SYNC_COMPONENT) {
                        info!(node_id = %self.node_id, attempts = attempt, "sync recovered");
                    }
                    return Ok(report);
                }
                Err(e) if e.is_retryable() && self.retry.should_retry(attempt) => {
                    let error = e.to_string();
                    lock(&self.degradation).record(SYNC_COMPONENT, &error, attempt);
                    events::sync_degraded(&self.node_id, attempt, &error);
                    self.set_status(SyncStatus::Degraded {
                        attempt,
                        last_error: error,
                    });
                    self.metrics.retry();
                    tokio::time::sleep(self.retry.delay(attempt)).await;
                }
                Err(e) => {
                    self.metrics.failure();
                    if e.is_retryable() {
                        lock(&self.degradation).record(SYNC_COMPONENT, &e.to_string(), attempt);
                        self.set_status(SyncStatus::Offline);
                        self.emit(SyncEvent::PersistentFailure {
                            attempts: attempt,
                            error: e.to_string(),
                        });
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Ask the hub for the full tenant state and merge it through the normal
    /// delivery path. Needs the `reconciliation:request` scope.
    pub async fn reconcile(&self, reason: &str) -> SynapseResult<SyncReport> {
        let mut session = self.session.lock().await;
        if !session.is_connected() {
            self.connect_locked(&mut session).await?;
        }
        let known = self.clock().await?;
        let request = SyncMessage {
            sequence_number: 0,
            timestamp_ms: now_ms(),
            node_id: self.node_id.clone(),
            vector_clock: known.clone(),
            payload: SyncPayload::ReconciliationRequest(ReconciliationRequest {
                reason: reason.to_string(),
                known_clock: known.clone(),
            }),
        };
        let response = session
            .request(WireMessage::push(&known, vec![request]), self.config.request_timeout())
            .await?;
        let reply = response
            .data
            .unwrap_or_default()
            .into_iter()
            .find_map(|m| match m.payload {
                SyncPayload::ReconciliationResponse(reply) => Some(reply),
                _ => None,
            })
            .ok_or_else(|| TransportError::UnexpectedMessage {
                expected: "reconciliationResponse".to_string(),
                received: "ack without reconciliation data".to_string(),
            })?;
        drop(session);

        let pulled = reply.records.len();
        let mut report = self.deliver(reply.records, Some(reply.hub_clock)).await?;
        report.pulled = pulled;
        self.metrics.pulled(pulled);
        info!(node_id = %self.node_id, pulled, applied = report.applied, "reconciled with hub");
        Ok(report)
    }

    /// Periodic sync until `shutdown` flips to `true` or its sender drops.
    /// Returns early with the error when the hub refuses our credentials.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> SynapseResult<()> {
        let period = self.config.sync_interval().max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sync_with_retry().await {
                        Ok(_) => {}
                        Err(e) if e.is_fatal_auth() => return Err(e),
                        Err(e) => warn!(node_id = %self.node_id, error = %e, "sync cycle failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        self.disconnect().await;
        Ok(())
    }

    // ─── Status & events ────────────────────────────────────────────────────

    fn set_status(&self, status: SyncStatus) {
        let previous = self.status.send_replace(status.clone());
        if previous != status {
            debug!(node_id = %self.node_id, ?status, "sync status changed");
            self.emit(SyncEvent::StatusChanged(status));
        }
    }

    fn emit(&self, event: SyncEvent) {
        lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }
}

fn episode_payload(operation: EpisodeOperation, episode: &EpisodeRecord) -> SyncPayload {
    SyncPayload::Episode(EpisodeSync {
        operation,
        episode: episode.clone(),
    })
}

fn require_episode(conn: &Connection, id: &str) -> SynapseResult<EpisodeRecord> {
    episode_ops::get_episode(conn, id)?.ok_or_else(|| SynapseError::NotFound {
        kind: "episode",
        id: id.to_string(),
    })
}
