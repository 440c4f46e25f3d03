//! Property tests for causal edge merging.

use proptest::prelude::*;
use synapse_crdt::VectorClock;
use synapse_protocol::CausalEdge;

const NODES: [&str; 3] = ["A", "B", "C"];

fn clock_strategy() -> impl Strategy<Value = VectorClock> {
    prop::collection::vec((0usize..NODES.len(), 0u64..4), 0..4)
        .prop_map(|entries| VectorClock::from_entries(entries.into_iter().map(|(node, v)| (NODES[node], v))))
}

/// Versions of the `m1 -> m2` edge as different nodes could have written them.
fn edge_strategy() -> impl Strategy<Value = CausalEdge> {
    (
        0u8..4,
        prop::collection::vec((0usize..NODES.len(), -10i8..=10, 0u8..=10, 0u64..40), 1..4),
        0u8..=10,
        0i64..4,
        prop::collection::vec(0u8..5, 0..4),
        clock_strategy(),
        prop::option::of(0u8..=10),
    )
        .prop_map(|(id, contributions, similarity, ts, evidence, version, confounder)| {
            let mut edge = CausalEdge::new(("m1", "episode"), ("m2", "episode"), f64::from(similarity) / 10.0, "A", ts);
            edge.edge_id = format!("edge-{id}");
            for (node, uplift, confidence, samples) in contributions {
                edge.last_modified_by = NODES[node].to_string();
                edge = edge.with_estimate(f64::from(uplift) / 10.0, f64::from(confidence) / 10.0, samples);
            }
            edge.confounder_score = confounder.map(|c| f64::from(c) / 10.0);
            edge.version = version;
            edge.with_evidence(evidence.into_iter().map(|e| format!("ep-{e}")))
        })
}

proptest! {
    #[test]
    fn edge_merge_is_commutative(a in edge_strategy(), b in edge_strategy()) {
        prop_assert_eq!(a.merge_concurrent(&b), b.merge_concurrent(&a));
    }

    #[test]
    fn edge_merge_is_associative(a in edge_strategy(), b in edge_strategy(), c in edge_strategy()) {
        prop_assert_eq!(
            a.merge_concurrent(&b).merge_concurrent(&c),
            a.merge_concurrent(&b.merge_concurrent(&c))
        );
    }

    #[test]
    fn edge_merge_is_idempotent(a in edge_strategy(), b in edge_strategy()) {
        prop_assert_eq!(a.merge_concurrent(&a), a.clone());
        let merged = a.merge_concurrent(&b);
        prop_assert_eq!(merged.merge_concurrent(&b), merged.clone());
    }

    #[test]
    fn superseding_edge_wins_and_keeps_other_nodes(stored in edge_strategy(), fresh in edge_strategy()) {
        let next = fresh.clone().superseding(&stored);
        prop_assert_eq!(next.merge_concurrent(&stored), next.clone());
        prop_assert_eq!(&next.edge_id, &stored.edge_id);
        for (node, _) in stored.estimates.iter() {
            prop_assert!(next.estimates.get(node).is_some());
        }
        prop_assert!(next.sample_size >= fresh.estimates.sample_size());
    }
}
