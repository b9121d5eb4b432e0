//! Round-trip test for the JSON fixtures the `run_scenario` demo loads:
//! confirms the on-disk shape actually deserializes into the typed model
//! and drives the kernel, not just that the binary happens to work.

use infra_sim_core::graph::Graph;
use infra_sim_core::model::{Scenario, TokenStatus};
use infra_sim_core::ScenarioRunner;

const GRAPH_JSON: &str = include_str!("../demos/fixtures/graph.json");
const SCENARIO_JSON: &str = include_str!("../demos/fixtures/scenario.json");

#[test]
fn bundled_fixtures_deserialize_and_drive_the_kernel() {
    let graph: Graph = serde_json::from_str(GRAPH_JSON).unwrap();
    let scenario: Scenario = serde_json::from_str(SCENARIO_JSON).unwrap();

    let mut runner = ScenarioRunner::new(scenario, graph).unwrap();
    let snapshot = runner.seek_to(2100);

    assert_eq!(snapshot.tokens.len(), 1);
    assert_eq!(snapshot.tokens[0].status, TokenStatus::Completed);
    assert_eq!(snapshot.tokens[0].path.last().map(String::as_str), Some("db1"));
}

#[test]
fn scenario_json_round_trips_through_serialize_and_deserialize() {
    let scenario: Scenario = serde_json::from_str(SCENARIO_JSON).unwrap();
    let reserialized = serde_json::to_string(&scenario).unwrap();
    let reparsed: Scenario = serde_json::from_str(&reserialized).unwrap();
    assert_eq!(scenario, reparsed);
}
