//! Causal delivery planning: buffering, duplicates, and gap settling.

use synapse_crdt::{ClockOrdering, VectorClock};
use synapse_sync::plan_delivery;
use test_fixtures::{clock, episode, episode_message, T0};

fn ids(plan: &synapse_sync::DeliveryPlan) -> Vec<String> {
    plan.ready.iter().map(|(m, _)| m.record_id()).collect()
}

#[test]
fn out_of_order_records_are_reordered() {
    let first = episode_message(1, "B", &[("B", 1)], episode("b1", "t", "B", T0));
    let second = episode_message(2, "B", &[("B", 2)], episode("b2", "t", "B", T0 + 1));

    let plan = plan_delivery(vec![second, first], &VectorClock::new(), None);

    assert_eq!(ids(&plan), vec!["b1", "b2"]);
    assert_eq!(plan.clock, clock(&[("B", 2)]));
    assert!(plan.deferred.is_empty());
}

#[test]
fn record_waits_for_cross_node_predecessor() {
    // B wrote after seeing A:1, which has not arrived.
    let from_b = episode_message(1, "B", &[("A", 1), ("B", 1)], episode("b1", "t", "B", T0));

    let plan = plan_delivery(vec![from_b], &VectorClock::new(), None);

    assert!(plan.ready.is_empty());
    assert_eq!(plan.deferred.len(), 1);
    assert_eq!(plan.clock, VectorClock::new());
}

#[test]
fn covered_records_count_as_duplicates() {
    let local = clock(&[("B", 2)]);
    let old = episode_message(2, "B", &[("B", 2)], episode("b2", "t", "B", T0));

    let plan = plan_delivery(vec![old], &local, None);

    assert!(plan.ready.is_empty());
    assert_eq!(plan.duplicates, 1);
}

#[test]
fn ordering_reflects_local_state_at_delivery() {
    let local = clock(&[("A", 1)]);
    let independent = episode_message(1, "B", &[("B", 1)], episode("b1", "t", "B", T0));
    let informed = episode_message(2, "C", &[("A", 1), ("C", 1)], episode("c1", "t", "C", T0));

    let plan = plan_delivery(vec![independent], &local, None);
    assert_eq!(plan.ready[0].1, ClockOrdering::Concurrent);

    let plan = plan_delivery(vec![informed], &local, None);
    assert_eq!(plan.ready[0].1, ClockOrdering::Before);
}

#[test]
fn stuck_record_is_released_once_hub_view_is_complete() {
    // B:1 was rejected by the hub, so only B:2 exists there.
    let orphan = episode_message(2, "B", &[("B", 2)], episode("b2", "t", "B", T0));
    let hub_clock = clock(&[("B", 2)]);

    let without_hub = plan_delivery(vec![orphan.clone()], &VectorClock::new(), None);
    assert_eq!(without_hub.deferred.len(), 1);

    let plan = plan_delivery(vec![orphan], &VectorClock::new(), Some(&hub_clock));
    assert_eq!(plan.gaps_settled, 1);
    assert_eq!(ids(&plan), vec!["b2"]);
    assert_eq!(plan.clock, hub_clock);
}

#[test]
fn records_beyond_hub_clock_stay_buffered() {
    // Broadcast raced ahead of the pull snapshot.
    let ahead = episode_message(3, "B", &[("B", 3)], episode("b3", "t", "B", T0));
    let hub_clock = clock(&[("B", 2)]);

    let plan = plan_delivery(vec![ahead], &VectorClock::new(), Some(&hub_clock));

    assert_eq!(plan.gaps_settled, 0);
    assert_eq!(plan.deferred.len(), 1);
}

#[test]
fn settling_one_gap_unblocks_successors() {
    let b2 = episode_message(2, "B", &[("B", 2)], episode("b2", "t", "B", T0));
    let b3 = episode_message(3, "B", &[("B", 3)], episode("b3", "t", "B", T0 + 1));
    let hub_clock = clock(&[("B", 3)]);

    let plan = plan_delivery(vec![b3, b2], &VectorClock::new(), Some(&hub_clock));

    assert_eq!(plan.gaps_settled, 1);
    assert_eq!(ids(&plan), vec!["b2", "b3"]);
}
