//! Property tests for synapse-causal: confidence monotonicity, uplift as a
//! difference of means, chain bounds and effect ordering.

use proptest::prelude::*;

use synapse_causal::query::{effect_order, rank_effects};
use synapse_causal::traversal::find_chains;
use synapse_causal::uplift;
use synapse_causal::{EffectFilter, IndexedGraph, Observation};
use synapse_core::config::ConfidenceCurve;
use test_fixtures::edge;

fn curve_strategy() -> impl Strategy<Value = ConfidenceCurve> {
    prop_oneof![
        (1.0f64..100.0).prop_map(|saturation| ConfidenceCurve::Linear { saturation }),
        (0.01f64..2.0).prop_map(|rate| ConfidenceCurve::Exponential { rate }),
    ]
}

fn balanced(treatment: &[f64], control: &[f64]) -> Vec<Observation> {
    treatment
        .iter()
        .map(|v| Observation::treatment("exp", "t", *v))
        .chain(control.iter().map(|v| Observation::control("exp", "c", *v)))
        .collect()
}

fn random_graph(n: usize, edges: &[(usize, usize, f64, f64)]) -> IndexedGraph {
    IndexedGraph::from_edges(
        edges
            .iter()
            .filter(|(from, to, _, _)| from % n != to % n)
            .map(|&(from, to, uplift, conf)| edge(&format!("n{}", from % n), &format!("n{}", to % n), uplift, conf, 5)),
    )
}

fn edge_list() -> impl Strategy<Value = Vec<(usize, usize, f64, f64)>> {
    prop::collection::vec((0usize..8, 0usize..8, -1.0f64..1.0, 0.0f64..1.0), 0..24)
}

proptest! {
    #[test]
    fn confidence_never_drops_as_matched_samples_grow(curve in curve_strategy(), n in 0u64..500) {
        let now = curve.confidence(n);
        let next = curve.confidence(n + 1);
        prop_assert!(next >= now);
        prop_assert!((0.0..=1.0).contains(&now));
    }

    #[test]
    fn adding_a_matched_pair_never_lowers_confidence(
        curve in curve_strategy(),
        treatment in prop::collection::vec(0.0f64..1.0, 1..20),
        control in prop::collection::vec(0.0f64..1.0, 1..20),
        extra in (0.0f64..1.0, 0.0f64..1.0),
    ) {
        let before = uplift::estimate("exp", &balanced(&treatment, &control), &curve, 5).unwrap();
        let mut treatment = treatment;
        let mut control = control;
        treatment.push(extra.0);
        control.push(extra.1);
        let after = uplift::estimate("exp", &balanced(&treatment, &control), &curve, 5).unwrap();
        prop_assert!(after.confidence >= before.confidence);
        prop_assert_eq!(after.matched_samples(), before.matched_samples() + 1);
    }

    #[test]
    fn uplift_is_the_difference_of_means(
        treatment in prop::collection::vec(-10.0f64..10.0, 1..30),
        control in prop::collection::vec(-10.0f64..10.0, 1..30),
    ) {
        let est = uplift::estimate("exp", &balanced(&treatment, &control), &ConfidenceCurve::default(), 5).unwrap();
        let t = treatment.iter().sum::<f64>() / treatment.len() as f64;
        let c = control.iter().sum::<f64>() / control.len() as f64;
        prop_assert!((est.uplift - (t - c)).abs() < 1e-9);
    }

    #[test]
    fn chains_respect_depth_and_never_revisit(edges in edge_list(), max_depth in 1usize..6) {
        let graph = random_graph(8, &edges);
        for to in 1..8 {
            let chains = find_chains(&graph, "n0", &format!("n{to}"), max_depth);
            for chain in &chains {
                prop_assert!(chain.hops() <= max_depth);
                prop_assert_eq!(chain.memory_ids.len(), chain.hops() + 1);
                let mut seen = chain.memory_ids.clone();
                seen.sort();
                seen.dedup();
                prop_assert_eq!(seen.len(), chain.memory_ids.len());
                prop_assert_eq!(chain.memory_ids.first().map(String::as_str), Some("n0"));
            }
            for pair in chains.windows(2) {
                prop_assert!(pair[0].hops() <= pair[1].hops());
            }
        }
    }

    #[test]
    fn ranked_effects_are_sorted_and_filtered(edges in edge_list(), min_conf in 0.0f64..1.0) {
        let graph = random_graph(8, &edges);
        let all: Vec<_> = graph
            .graph
            .edge_indices()
            .filter_map(|idx| graph.graph.edge_weight(idx).cloned())
            .collect();
        let filter = EffectFilter::default().min_confidence(min_conf);
        let ranked = rank_effects(all, &filter);
        for e in &ranked {
            prop_assert!(e.confidence >= min_conf);
        }
        for pair in ranked.windows(2) {
            prop_assert_ne!(effect_order(&pair[0], &pair[1]), std::cmp::Ordering::Greater);
        }
    }
}
