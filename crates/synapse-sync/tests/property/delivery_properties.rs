//! Property tests for causal delivery planning.

use proptest::prelude::*;
use synapse_crdt::VectorClock;
use synapse_protocol::{EpisodeOperation, EpisodeSync, SyncMessage, SyncPayload};
use synapse_sync::plan_delivery;
use test_fixtures::{episode, T0};

const NODES: [&str; 3] = ["A", "B", "C"];

/// Replay `ops` as a causally consistent history. Each op is a local write on
/// one node, optionally after that node has seen everything another node
/// has written so far.
fn history(ops: &[(usize, Option<usize>)]) -> Vec<SyncMessage> {
    let mut clocks = vec![VectorClock::new(); NODES.len()];
    let mut messages = Vec::with_capacity(ops.len());
    for (i, &(node, observed)) in ops.iter().enumerate() {
        if let Some(peer) = observed {
            let seen = clocks[peer].clone();
            clocks[node].merge(&seen);
        }
        clocks[node].increment(NODES[node]);
        let id = format!("ep-{i}");
        messages.push(SyncMessage {
            sequence_number: clocks[node].get(NODES[node]),
            timestamp_ms: T0 + i as i64,
            node_id: NODES[node].to_string(),
            vector_clock: clocks[node].clone(),
            payload: SyncPayload::Episode(EpisodeSync {
                operation: EpisodeOperation::Create,
                episode: episode(&id, "task", NODES[node], T0 + i as i64),
            }),
        });
    }
    messages
}

fn ops_strategy() -> impl Strategy<Value = Vec<(usize, Option<usize>)>> {
    prop::collection::vec((0..NODES.len(), prop::option::of(0..NODES.len())), 1..24)
}

fn shuffled_history() -> impl Strategy<Value = Vec<SyncMessage>> {
    ops_strategy().prop_flat_map(|ops| Just(history(&ops)).prop_shuffle())
}

fn union_clock(messages: &[SyncMessage]) -> VectorClock {
    messages
        .iter()
        .fold(VectorClock::new(), |acc, m| acc.merged(&m.vector_clock))
}

proptest! {
    #[test]
    fn any_arrival_order_delivers_everything(messages in shuffled_history()) {
        let expected = union_clock(&messages);
        let total = messages.len();
        let plan = plan_delivery(messages, &VectorClock::new(), None);

        prop_assert_eq!(plan.ready.len(), total);
        prop_assert_eq!(plan.duplicates, 0);
        prop_assert!(plan.deferred.is_empty());
        prop_assert_eq!(plan.gaps_settled, 0);
        prop_assert_eq!(plan.clock, expected);
    }

    #[test]
    fn delivery_order_respects_causality(messages in shuffled_history()) {
        let plan = plan_delivery(messages, &VectorClock::new(), None);
        let mut applied = VectorClock::new();
        for (message, _) in &plan.ready {
            prop_assert!(message.vector_clock.is_next_from(&message.node_id, &applied));
            applied.merge(&message.vector_clock);
        }
    }

    #[test]
    fn redelivered_records_are_counted_once(messages in shuffled_history()) {
        let total = messages.len();
        let mut doubled = messages.clone();
        doubled.extend(messages);
        let plan = plan_delivery(doubled, &VectorClock::new(), None);

        prop_assert_eq!(plan.ready.len(), total);
        prop_assert_eq!(plan.duplicates, total);
    }

    #[test]
    fn already_applied_history_is_all_duplicates(messages in shuffled_history()) {
        let local = union_clock(&messages);
        let total = messages.len();
        let plan = plan_delivery(messages, &local, None);

        prop_assert!(plan.ready.is_empty());
        prop_assert_eq!(plan.duplicates, total);
        prop_assert_eq!(plan.clock, local);
    }
}
