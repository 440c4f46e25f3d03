//! Uplift against the golden experiment set.

use std::sync::Arc;

use synapse_causal::uplift;
use synapse_causal::{CausalMemoryGraph, ExperimentSpec, Observation};
use synapse_core::config::{CausalConfig, ConfidenceCurve};
use synapse_storage::AgentStore;
use test_fixtures::{load_fixture, UpliftCase};

fn cases() -> Vec<UpliftCase> {
    load_fixture("uplift/basic_experiments.json")
}

fn observations(case: &UpliftCase) -> Vec<Observation> {
    let treated = case
        .treatment
        .iter()
        .enumerate()
        .map(|(i, v)| Observation::treatment(&case.name, &format!("t-{i}"), *v));
    let control = case
        .control
        .iter()
        .enumerate()
        .map(|(i, v)| Observation::control(&case.name, &format!("c-{i}"), *v));
    treated.chain(control).collect()
}

#[test]
fn golden_uplift_from_observations() {
    let curve = ConfidenceCurve::default();
    for case in cases() {
        let estimate = uplift::estimate(&case.name, &observations(&case), &curve, 5).unwrap();
        assert!(
            (estimate.uplift - case.expected_uplift).abs() <= case.tolerance,
            "{}: got {}, expected {}",
            case.name,
            estimate.uplift,
            case.expected_uplift
        );
        assert_eq!(estimate.treatment_count as usize, case.treatment.len());
        assert_eq!(estimate.control_count as usize, case.control.len());
    }
}

#[tokio::test]
async fn golden_uplift_through_the_graph() {
    let store = Arc::new(AgentStore::open_in_memory().unwrap());
    let graph = CausalMemoryGraph::new(store, "node-a", CausalConfig::default());

    for case in cases() {
        let exp = graph
            .create_experiment(ExperimentSpec::new(&case.name, format!("treat-{}", case.name), "skill"))
            .await
            .unwrap();
        for mut obs in observations(&case) {
            obs.experiment_id = exp.id.clone();
            graph.record_observation(obs).await.unwrap();
        }

        let estimate = graph.calculate_uplift(&exp.id).await.unwrap();
        assert!(
            (estimate.uplift - case.expected_uplift).abs() <= case.tolerance,
            "{}: got {}",
            case.name,
            estimate.uplift
        );
    }
}

#[test]
fn unbalanced_groups_use_the_smaller_side_for_confidence() {
    let case = cases()
        .into_iter()
        .find(|c| c.name == "unbalanced_groups")
        .expect("fixture present");
    let curve = ConfidenceCurve::Linear { saturation: 4.0 };

    let estimate = uplift::estimate(&case.name, &observations(&case), &curve, 2).unwrap();

    assert_eq!(estimate.matched_samples(), 1);
    assert!((estimate.confidence - 0.25).abs() < 1e-12);
    assert!(!estimate.reliable);
}
