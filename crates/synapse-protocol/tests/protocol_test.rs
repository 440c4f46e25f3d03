use synapse_crdt::VectorClock;
use synapse_protocol::{
    channel_pair, CausalEdge, CausalEdgeSync, EpisodeContent, EpisodeOperation, EpisodeRecord,
    EpisodeSync, MessageType, RecordKind, SkillOutcome, SkillRecord, SkillSync, SyncMessage,
    SyncPayload, Transport, WireMessage,
};

fn episode_message(seq: u64) -> SyncMessage {
    let episode = EpisodeRecord::new(
        format!("ep-{seq}"),
        EpisodeContent::new("s1", "summarize logs", 0.8, true),
        "A",
        1_000,
    );
    SyncMessage {
        sequence_number: seq,
        timestamp_ms: 1_000,
        node_id: "A".to_string(),
        vector_clock: VectorClock::from_entries([("A", seq)]),
        payload: SyncPayload::Episode(EpisodeSync {
            operation: EpisodeOperation::Create,
            episode,
        }),
    }
}

// ─── Wire shape ─────────────────────────────────────────────────────────────

#[test]
fn wire_message_uses_documented_field_names() {
    let msg = WireMessage::push(&VectorClock::from_entries([("A", 2)]), vec![episode_message(1)]);
    let value: serde_json::Value = serde_json::to_value(&msg).unwrap();
    assert_eq!(value["type"], "push");
    assert_eq!(value["vectorClock"]["A"], 2);
    assert!(value["timestamp"].is_i64());
    assert_eq!(value["data"][0]["payload"]["kind"], "episode");
    assert_eq!(value["data"][0]["sequenceNumber"], 1);
    assert!(value.get("error").is_none());
    assert!(value.get("token").is_none());
}

#[test]
fn unknown_frames_fail_to_decode() {
    let err = WireMessage::from_json(r#"{"type":"gossip","timestamp":1}"#).unwrap_err();
    assert!(err.is_retryable());
}

#[test]
fn responses_correlate_by_request_id() {
    let pull = WireMessage::pull(&VectorClock::new());
    let ack = WireMessage::ack(pull.request_id.clone());
    let broadcast = WireMessage::broadcast(vec![]);
    assert!(ack.answers(&pull));
    assert!(!broadcast.answers(&pull));
}

// ─── Records ────────────────────────────────────────────────────────────────

#[test]
fn episode_merge_combines_lww_content_and_tag_union() {
    let mut a = EpisodeRecord::new("ep", EpisodeContent::new("s", "task", 0.1, false), "A", 10);
    let mut b = a.clone();
    a.add_tag("alpha", "A");
    b.add_tag("beta", "B");
    b.update_content(EpisodeContent::new("s", "task v2", 0.9, true), "B", 20);

    let mut left = a.clone();
    left.merge(&b);
    let mut right = b.clone();
    right.merge(&a);
    assert_eq!(left, right);
    assert_eq!(left.content.get().task, "task v2");
    assert_eq!(left.tags.len(), 2);
}

#[test]
fn episode_tombstone_follows_lww() {
    let mut ep = EpisodeRecord::new("ep", EpisodeContent::new("s", "t", 0.0, true), "A", 10);
    assert!(ep.tombstone("A", 11));
    assert!(ep.is_deleted());
    let mut stale = EpisodeRecord::new("ep", EpisodeContent::new("s", "t", 0.0, true), "A", 10);
    stale.merge(&ep);
    assert!(stale.is_deleted());

    let mut edited = EpisodeRecord::new("ep", EpisodeContent::new("s", "t", 0.0, true), "B", 10);
    assert!(edited.update_content(EpisodeContent::new("s", "later", 0.0, true), "B", 20));
    edited.merge(&ep);
    ep.merge(&edited);
    assert!(edited.is_deleted());
    assert!(ep.is_deleted());
    assert_eq!(ep, edited);
    assert_eq!(ep.content.get().task, "later");
}

#[test]
fn skill_usage_and_stats_merge_across_nodes() {
    let mut a = SkillRecord::new("sk", "grep", "search files", "A", 1);
    let mut b = a.clone();
    a.record_use("A", &SkillOutcome { success: true, reward: 1.0, latency_ms: 10.0 });
    b.record_use("B", &SkillOutcome { success: false, reward: 0.0, latency_ms: 30.0 });
    b.record_use("B", &SkillOutcome { success: true, reward: 0.5, latency_ms: 20.0 });
    a.merge(&b);
    assert_eq!(a.usage_count(), 3);
    assert!((a.stats.mean_reward() - 0.5).abs() < 1e-9);
}

#[test]
fn edge_validation_rejects_out_of_range_values() {
    let edge = CausalEdge::new(("m1", "episode"), ("m2", "skill"), 1.5, "A", 0);
    assert!(edge.validate().is_err());
    let edge = CausalEdge::new(("m1", "episode"), ("m2", "skill"), 0.5, "A", 0)
        .with_estimate(0.2, 1.2, 3);
    assert!(edge.validate().is_err());
    let edge = CausalEdge::new(("m1", "episode"), ("m1", "episode"), 0.5, "A", 0);
    assert!(edge.validate().is_err());
    let edge = CausalEdge::new(("m1", "episode"), ("m2", "skill"), 0.5, "A", 0)
        .with_estimate(0.2, 0.4, 3);
    assert!(edge.validate().is_ok());
}

#[test]
fn concurrent_edge_merge_weights_by_sample_size() {
    let a = CausalEdge::new(("x", "episode"), ("y", "episode"), 0.4, "A", 10)
        .with_estimate(0.1, 0.2, 1)
        .with_evidence(["e1"]);
    let b = CausalEdge::new(("x", "episode"), ("y", "episode"), 0.6, "B", 20)
        .with_estimate(0.5, 0.6, 3)
        .with_evidence(["e2", "e1"]);
    let merged = a.merge_concurrent(&b);
    assert_eq!(merged, b.merge_concurrent(&a));
    assert!((merged.uplift - 0.4).abs() < 1e-9);
    assert!((merged.confidence - 0.5).abs() < 1e-9);
    assert_eq!(merged.sample_size, 4);
    assert_eq!(merged.evidence_ids, vec!["e1", "e2"]);
    assert_eq!(merged.similarity, 0.6);

    assert_eq!(merged.merge_concurrent(&b), merged);
    assert_eq!(a.merge_concurrent(&a), a);
}

#[test]
fn newer_estimate_from_the_same_node_replaces_the_older() {
    let older = CausalEdge::new(("x", "episode"), ("y", "episode"), 0.4, "A", 10).with_estimate(0.1, 0.2, 5);
    let newer = CausalEdge::new(("x", "episode"), ("y", "episode"), 0.4, "A", 20)
        .with_estimate(0.3, 0.4, 7)
        .superseding(&older);

    let merged = older.merge_concurrent(&newer);

    assert_eq!(merged.sample_size, 7);
    assert!((merged.uplift - 0.3).abs() < 1e-9);
    assert_eq!(merged.edge_id, older.edge_id);
    assert_eq!(merged, newer);
}

#[test]
fn bare_edges_count_as_their_writers_estimate() {
    let mut a = CausalEdge::new(("x", "episode"), ("y", "episode"), 0.4, "A", 10);
    a.uplift = 0.2;
    a.confidence = 0.5;
    a.sample_size = 2;
    let b = CausalEdge::new(("x", "episode"), ("y", "episode"), 0.4, "B", 10).with_estimate(0.8, 0.5, 2);

    let merged = a.merge_concurrent(&b);

    assert_eq!(merged.sample_size, 4);
    assert!((merged.uplift - 0.5).abs() < 1e-9);
    assert_eq!(merged.estimates.len(), 2);
}

#[test]
fn message_kind_and_record_id() {
    let msg = episode_message(3);
    assert_eq!(msg.kind(), RecordKind::Episode);
    assert_eq!(msg.record_id(), "ep-3");
    assert_eq!(msg.operation(), "create");

    let edge = CausalEdge::new(("x", "episode"), ("y", "skill"), 0.5, "A", 0);
    let msg = SyncMessage {
        payload: SyncPayload::CausalEdge(CausalEdgeSync::from_edge(edge)),
        ..episode_message(4)
    };
    assert_eq!(msg.record_id(), "x->y");

    let skill = SkillRecord::new("sk", "grep", "", "A", 0);
    let msg = SyncMessage {
        payload: SyncPayload::Skill(SkillSync { skill }),
        ..episode_message(5)
    };
    assert_eq!(msg.operation(), "upsert");
}

// ─── Channel transport ──────────────────────────────────────────────────────

#[tokio::test]
async fn channel_pair_delivers_in_order_and_reports_close() {
    let (mut agent, mut hub) = channel_pair();
    agent.send(WireMessage::pull(&VectorClock::new())).await.unwrap();
    agent
        .send(WireMessage::push(&VectorClock::new(), vec![episode_message(1)]))
        .await
        .unwrap();

    let first = hub.recv().await.unwrap().unwrap();
    let second = hub.recv().await.unwrap().unwrap();
    assert_eq!(first.message_type, MessageType::Pull);
    assert_eq!(second.message_type, MessageType::Push);
    assert_eq!(second.data.unwrap()[0], episode_message(1));

    drop(agent);
    assert!(hub.recv().await.unwrap().is_none());
    assert!(hub.send(WireMessage::ack(None)).await.is_err());
}
