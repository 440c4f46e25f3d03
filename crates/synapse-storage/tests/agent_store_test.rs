//! Agent store tests: migrations, episode/skill state, the pending change
//! log, sync state, causal tables and certificates.

use synapse_protocol::{SkillOutcome, SkillRecord};
use synapse_storage::migrations::current_version;
use synapse_storage::queries::certificate_ops::{self, CertificateRow, ChunkRow};
use synapse_storage::queries::experiment_ops::{self, ExperimentRow, ObservationRow};
use synapse_storage::queries::{causal_edge_ops, episode_ops, pending_ops, skill_ops, sync_state_ops};
use synapse_storage::AgentStore;
use test_fixtures::{clock, edge, episode, episode_message, T0};

// ─── Migrations ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn in_memory_store_is_fully_migrated() {
    let store = AgentStore::open_in_memory().unwrap();
    let version = store.with_writer(|conn| current_version(conn)).await.unwrap();
    assert_eq!(version, 3);
}

// ─── Episodes & skills ──────────────────────────────────────────────────────

#[tokio::test]
async fn episode_upsert_and_tombstone_filtering() {
    let store = AgentStore::open_in_memory().unwrap();
    let live = episode("ep-1", "write tests", "A", T0);
    let mut gone = episode("ep-2", "old task", "A", T0);
    gone.tombstone("A", T0 + 10);

    store
        .with_writer(|conn| {
            episode_ops::upsert_episode(conn, &live)?;
            episode_ops::upsert_episode(conn, &gone)
        })
        .await
        .unwrap();

    let fetched = store
        .with_reader(|conn| episode_ops::get_episode(conn, "ep-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched, live);

    let visible = store
        .with_reader(|conn| episode_ops::list_episodes(conn, false))
        .await
        .unwrap();
    assert_eq!(visible.len(), 1);
    let all = store
        .with_reader(|conn| episode_ops::list_episodes(conn, true))
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert!(store
        .with_reader(|conn| episode_ops::get_episode(conn, "missing"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn skill_state_round_trips_through_storage() {
    let store = AgentStore::open_in_memory().unwrap();
    let mut skill = SkillRecord::new("sk-1", "grep", "search text", "A", T0);
    skill.record_use(
        "A",
        &SkillOutcome {
            success: true,
            reward: 0.9,
            latency_ms: 12.0,
        },
    );
    store
        .with_writer(|conn| skill_ops::upsert_skill(conn, &skill, T0))
        .await
        .unwrap();
    let loaded = store
        .with_reader(|conn| skill_ops::get_skill(conn, "sk-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.usage_count(), 1);
    assert_eq!(
        store.with_reader(|conn| skill_ops::list_skills(conn)).await.unwrap().len(),
        1
    );
}

// ─── Pending change log ─────────────────────────────────────────────────────

#[tokio::test]
async fn pending_changes_move_through_ack_and_reject() {
    let store = AgentStore::open_in_memory().unwrap();
    store
        .with_writer(|conn| {
            for seq in 1..=3 {
                let msg = episode_message(seq, "A", &[("A", seq)], episode(&format!("ep-{seq}"), "t", "A", T0));
                pending_ops::insert_pending(conn, &msg)?;
            }
            Ok(())
        })
        .await
        .unwrap();

    let batch = store
        .with_writer(|conn| pending_ops::pending_batch(conn, 2))
        .await
        .unwrap();
    assert_eq!(batch.iter().map(|m| m.sequence_number).collect::<Vec<_>>(), vec![1, 2]);

    store
        .with_writer(|conn| {
            pending_ops::record_attempt(conn, &[1, 2], "timeout")?;
            pending_ops::mark_acked(conn, &[1], T0)?;
            pending_ops::mark_rejected(conn, 2, "missing scope")
        })
        .await
        .unwrap();

    let (count, attempts, rejected) = store
        .with_writer(|conn| {
            Ok((
                pending_ops::pending_count(conn)?,
                pending_ops::attempts(conn, 1)?,
                pending_ops::rejected_changes(conn)?,
            ))
        })
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(attempts, 1);
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].sequence_number, 2);
    assert_eq!(rejected[0].reason, "missing scope");

    // Acking twice is harmless.
    let again = store
        .with_writer(|conn| pending_ops::mark_acked(conn, &[1], T0))
        .await
        .unwrap();
    assert_eq!(again, 0);
}

// ─── Sync state ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn sync_state_allocates_sequences_and_persists_clock() {
    let store = AgentStore::open_in_memory().unwrap();
    let state = store
        .with_transaction(|conn| {
            sync_state_ops::init_sync_state(conn, "A")?;
            // Second init keeps the original row.
            sync_state_ops::init_sync_state(conn, "B")?;
            assert_eq!(sync_state_ops::allocate_sequence(conn)?, 1);
            assert_eq!(sync_state_ops::allocate_sequence(conn)?, 2);
            sync_state_ops::save_clock(conn, &clock(&[("A", 2), ("B", 1)]))?;
            sync_state_ops::mark_synced(conn, T0)?;
            sync_state_ops::load_sync_state(conn)
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.node_id, "A");
    assert_eq!(state.next_sequence, 3);
    assert_eq!(state.vector_clock, clock(&[("A", 2), ("B", 1)]));
    assert_eq!(state.last_sync_at_ms, Some(T0));
}

// ─── Causal tables ──────────────────────────────────────────────────────────

#[tokio::test]
async fn edge_upsert_replaces_by_endpoint_pair() {
    let store = AgentStore::open_in_memory().unwrap();
    let first = edge("a", "b", 0.2, 0.5, 10);
    let mut second = edge("a", "b", 0.4, 0.7, 20);
    second.updated_at_ms = T0 + 5;

    store
        .with_writer(|conn| {
            causal_edge_ops::upsert_edge(conn, &first)?;
            causal_edge_ops::upsert_edge(conn, &second)?;
            causal_edge_ops::upsert_edge(conn, &edge("a", "c", 0.1, 0.2, 1))
        })
        .await
        .unwrap();

    let stored = store
        .with_reader(|conn| causal_edge_ops::get_edge(conn, "a", "b"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, second);
    assert_eq!(stored.sample_size, 20);
    assert!((stored.uplift - 0.4).abs() < 1e-12);
    assert_eq!(stored.estimates, second.estimates);

    let count = store.with_reader(|conn| causal_edge_ops::edge_count(conn)).await.unwrap();
    assert_eq!(count, 2);
    let from_a = store
        .with_reader(|conn| causal_edge_ops::edges_from(conn, "a"))
        .await
        .unwrap();
    assert_eq!(from_a.len(), 2);
}

#[tokio::test]
async fn prune_only_removes_weak_and_stale_edges() {
    let store = AgentStore::open_in_memory().unwrap();
    let weak_old = edge("a", "b", 0.1, 0.05, 1);
    let strong_old = edge("a", "c", 0.3, 0.9, 50);
    let mut weak_recent = edge("a", "d", 0.1, 0.05, 1);
    weak_recent.updated_at_ms = T0 + 1_000_000;

    let removed = store
        .with_writer(|conn| {
            causal_edge_ops::upsert_edge(conn, &weak_old)?;
            causal_edge_ops::upsert_edge(conn, &strong_old)?;
            causal_edge_ops::upsert_edge(conn, &weak_recent)?;
            causal_edge_ops::prune_edges(conn, 0.1, 3, T0 + 1)
        })
        .await
        .unwrap();
    assert_eq!(removed, 1);
    let remaining: Vec<String> = store
        .with_reader(|conn| causal_edge_ops::list_edges(conn))
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.to_memory_id)
        .collect();
    assert_eq!(remaining, vec!["c", "d"]);
}

#[tokio::test]
async fn experiment_observations_bump_counters_until_completed() {
    let store = AgentStore::open_in_memory().unwrap();
    let exp = ExperimentRow {
        id: "exp-1".into(),
        name: "tests first".into(),
        hypothesis: String::new(),
        treatment_id: "ep-1".into(),
        treatment_type: "episode".into(),
        control_id: None,
        target_memory_id: None,
        target_memory_type: None,
        status: experiment_ops::STATUS_RUNNING.into(),
        start_time_ms: T0,
        end_time_ms: None,
        last_observation_ms: T0,
        sample_size: 0,
    };
    store
        .with_transaction(|conn| {
            experiment_ops::insert_experiment(conn, &exp)?;
            for (i, treated) in [true, false].into_iter().enumerate() {
                experiment_ops::insert_observation(
                    conn,
                    &ObservationRow {
                        experiment_id: "exp-1".into(),
                        episode_id: format!("ep-{i}"),
                        is_treatment: treated,
                        outcome_value: 0.5,
                        outcome_type: "reward".into(),
                        recorded_at_ms: T0 + 100,
                    },
                )?;
            }
            Ok(())
        })
        .await
        .unwrap();

    let loaded = store
        .with_reader(|conn| experiment_ops::get_experiment(conn, "exp-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.sample_size, 2);
    assert_eq!(loaded.last_observation_ms, T0 + 100);

    let idle = store
        .with_reader(|conn| experiment_ops::idle_running_experiments(conn, T0 + 200))
        .await
        .unwrap();
    assert_eq!(idle, vec!["exp-1".to_string()]);

    let done = store
        .with_writer(|conn| experiment_ops::complete_experiment(conn, "exp-1", T0 + 300))
        .await
        .unwrap();
    assert!(done);
    let twice = store
        .with_writer(|conn| experiment_ops::complete_experiment(conn, "exp-1", T0 + 400))
        .await
        .unwrap();
    assert!(!twice);
    let running = store
        .with_reader(|conn| experiment_ops::list_experiments(conn, Some(experiment_ops::STATUS_RUNNING)))
        .await
        .unwrap();
    assert!(running.is_empty());
    let observations = store
        .with_reader(|conn| experiment_ops::list_observations(conn, "exp-1"))
        .await
        .unwrap();
    assert_eq!(observations.len(), 2);
}

// ─── Certificates ───────────────────────────────────────────────────────────

#[tokio::test]
async fn certificate_chunks_keep_leaf_order() {
    let store = AgentStore::open_in_memory().unwrap();
    let cert = CertificateRow {
        id: "cert-1".into(),
        query_id: "q-1".into(),
        query_text: "why".into(),
        requirements: vec!["x".into()],
        minimal_why: vec!["c2".into()],
        unsatisfied: vec![],
        merkle_root: "00".into(),
        access_level: "full".into(),
        chunk_count: 2,
        created_at_ms: T0,
    };
    let chunks: Vec<ChunkRow> = ["c1", "c2"]
        .iter()
        .enumerate()
        .map(|(i, id)| ChunkRow {
            position: i as u32,
            chunk_id: id.to_string(),
            chunk_type: "episode".into(),
            content: format!("content {id}"),
            relevance: 0.5,
            tags: vec!["x".into()],
        })
        .collect();
    store
        .with_transaction(|conn| certificate_ops::insert_certificate(conn, &cert, &chunks))
        .await
        .unwrap();

    let (loaded, loaded_chunks) = store
        .with_reader(|conn| {
            Ok((
                certificate_ops::get_certificate(conn, "cert-1")?,
                certificate_ops::get_chunks(conn, "cert-1")?,
            ))
        })
        .await
        .unwrap();
    assert_eq!(loaded.unwrap(), cert);
    assert_eq!(loaded_chunks, chunks);

    let changed = store
        .with_writer(|conn| certificate_ops::update_chunk_content(conn, "cert-1", "c2", "edited"))
        .await
        .unwrap();
    assert!(changed);
}
