//! Property tests for merge laws and clock ordering.

use proptest::prelude::*;
use synapse_crdt::{
    ClockOrdering, EstimateSet, GCounter, LWWRegister, ORSet, UniqueTag, VectorClock, WeightedStats,
};

const NODES: [&str; 4] = ["A", "B", "C", "D"];

fn clock_strategy() -> impl Strategy<Value = VectorClock> {
    prop::collection::vec((0usize..NODES.len(), 0u64..6), 0..6).prop_map(|entries| {
        let mut clock = VectorClock::new();
        for (node, count) in entries {
            for _ in 0..count {
                clock.increment(NODES[node]);
            }
        }
        clock
    })
}

fn gcounter_strategy() -> impl Strategy<Value = GCounter> {
    prop::collection::vec((0usize..NODES.len(), 1u64..10), 0..6).prop_map(|ops| {
        let mut counter = GCounter::new();
        for (node, delta) in ops {
            counter.increment(NODES[node], delta);
        }
        counter
    })
}

fn lww_strategy() -> impl Strategy<Value = LWWRegister<u8>> {
    (any::<u8>(), 0i64..5, 0usize..NODES.len())
        .prop_map(|(value, ts, node)| LWWRegister::new(value, ts, NODES[node]))
}

/// Deterministic tags so generated sets can share add operations.
fn orset_strategy() -> impl Strategy<Value = ORSet<u8>> {
    prop::collection::vec((0u8..4, 0usize..NODES.len(), 0i64..4, any::<bool>()), 0..10).prop_map(
        |ops| {
            let mut set = ORSet::new();
            for (element, node, ts, remove) in ops {
                if remove {
                    set.remove(&element);
                } else {
                    set.add_tagged(
                        element,
                        UniqueTag {
                            node_id: NODES[node].to_string(),
                            timestamp_ms: ts,
                            nonce: format!("{element}-{ts}"),
                        },
                    );
                }
            }
            set
        },
    )
}

fn stats_strategy() -> impl Strategy<Value = WeightedStats> {
    prop::collection::vec((0usize..NODES.len(), any::<bool>(), 0u8..=10), 0..8).prop_map(|ops| {
        let mut stats = WeightedStats::new();
        for (node, success, reward) in ops {
            stats.record(NODES[node], success, f64::from(reward) / 10.0, 50.0);
        }
        stats
    })
}

fn estimates_strategy() -> impl Strategy<Value = EstimateSet> {
    prop::collection::vec((0usize..NODES.len(), -10i8..=10, 0u8..=10, 0u64..50), 0..8).prop_map(|ops| {
        let mut set = EstimateSet::new();
        for (node, uplift, confidence, samples) in ops {
            set.set(NODES[node], f64::from(uplift) / 10.0, f64::from(confidence) / 10.0, samples);
        }
        set
    })
}

proptest! {
    #[test]
    fn clock_merge_is_commutative(a in clock_strategy(), b in clock_strategy()) {
        prop_assert_eq!(a.merged(&b), b.merged(&a));
    }

    #[test]
    fn clock_merge_is_associative(a in clock_strategy(), b in clock_strategy(), c in clock_strategy()) {
        prop_assert_eq!(a.merged(&b).merged(&c), a.merged(&b.merged(&c)));
    }

    #[test]
    fn clock_merge_is_idempotent(a in clock_strategy()) {
        prop_assert_eq!(a.merged(&a), a);
    }

    #[test]
    fn clock_compare_is_antisymmetric(a in clock_strategy(), b in clock_strategy()) {
        prop_assert_eq!(a.compare(&b), b.compare(&a).inverse());
    }

    #[test]
    fn clock_merge_dominates_both_inputs(a in clock_strategy(), b in clock_strategy()) {
        let m = a.merged(&b);
        prop_assert!(a.is_covered_by(&m));
        prop_assert!(b.is_covered_by(&m));
    }

    #[test]
    fn clock_increment_moves_strictly_after(a in clock_strategy(), node in 0usize..NODES.len()) {
        prop_assert_eq!(a.incremented(NODES[node]).compare(&a), ClockOrdering::After);
    }

    #[test]
    fn gcounter_merge_laws(a in gcounter_strategy(), b in gcounter_strategy(), c in gcounter_strategy()) {
        prop_assert_eq!(a.merged(&b), b.merged(&a));
        prop_assert_eq!(a.merged(&b).merged(&c), a.merged(&b.merged(&c)));
        prop_assert_eq!(a.merged(&a), a.clone());
        prop_assert!(a.merged(&b).value() >= a.value().max(b.value()));
    }

    #[test]
    fn lww_merge_laws(a in lww_strategy(), b in lww_strategy(), c in lww_strategy()) {
        prop_assert_eq!(a.merged(&b), b.merged(&a));
        prop_assert_eq!(a.merged(&b).merged(&c), a.merged(&b.merged(&c)));
        prop_assert_eq!(a.merged(&a), a.clone());
    }

    #[test]
    fn orset_merge_laws(a in orset_strategy(), b in orset_strategy(), c in orset_strategy()) {
        prop_assert_eq!(a.merged(&b), b.merged(&a));
        prop_assert_eq!(a.merged(&b).merged(&c), a.merged(&b.merged(&c)));
        prop_assert_eq!(a.merged(&a), a.clone());
    }

    #[test]
    fn orset_fresh_readd_wins_over_removal_snapshot(seed in orset_strategy(), element in 0u8..4) {
        let mut set = seed;
        set.add(element, "A");
        set.remove(&element);
        let removal_snapshot = set.clone();
        set.add(element, "A");
        prop_assert!(set.merged(&removal_snapshot).contains(&element));
        prop_assert!(removal_snapshot.merged(&set).contains(&element));
    }

    #[test]
    fn weighted_stats_merge_laws(a in stats_strategy(), b in stats_strategy(), c in stats_strategy()) {
        prop_assert_eq!(a.merged(&b), b.merged(&a));
        prop_assert_eq!(a.merged(&b).merged(&c), a.merged(&b.merged(&c)));
        prop_assert_eq!(a.merged(&a), a.clone());
    }

    #[test]
    fn estimate_set_merge_laws(a in estimates_strategy(), b in estimates_strategy(), c in estimates_strategy()) {
        prop_assert_eq!(a.merged(&b), b.merged(&a));
        prop_assert_eq!(a.merged(&b).merged(&c), a.merged(&b.merged(&c)));
        prop_assert_eq!(a.merged(&a), a.clone());
    }

    #[test]
    fn rebased_estimates_win_the_merge(a in estimates_strategy(), base in estimates_strategy()) {
        let mut next = a.clone();
        next.rebase(&base);
        let merged = next.merged(&base);
        prop_assert_eq!(&merged, &next);
        for (node, estimate) in a.iter() {
            prop_assert_eq!(merged.get(node).map(|e| e.uplift), Some(estimate.uplift));
        }
    }
}
