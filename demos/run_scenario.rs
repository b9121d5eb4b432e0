//! Loads a graph and scenario from JSON and drives the kernel to a single
//! point in time, printing the resulting snapshot — a minimal stand-in for
//! the UI or test harness that would otherwise embed this crate.
//!
//! ```text
//! cargo run --bin run_scenario -- demos/fixtures/graph.json demos/fixtures/scenario.json 2100
//! ```

use std::fs;
use std::process::ExitCode;

use infra_sim_core::graph::Graph;
use infra_sim_core::model::Scenario;
use infra_sim_core::{ScenarioRunner, telemetry};

fn main() -> ExitCode {
    telemetry::init();

    let mut args = std::env::args().skip(1);
    let graph_path = args.next().unwrap_or_else(|| "demos/fixtures/graph.json".to_string());
    let scenario_path =
        args.next().unwrap_or_else(|| "demos/fixtures/scenario.json".to_string());
    let at_ms: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(2100);

    match run(&graph_path, &scenario_path, at_ms) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(report) => {
            eprintln!("{report:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(graph_path: &str, scenario_path: &str, at_ms: u64) -> miette::Result<String> {
    let graph_json = fs::read_to_string(graph_path)
        .map_err(|e| miette::miette!("reading {graph_path}: {e}"))?;
    let scenario_json = fs::read_to_string(scenario_path)
        .map_err(|e| miette::miette!("reading {scenario_path}: {e}"))?;

    let graph: Graph = serde_json::from_str(&graph_json)
        .map_err(|e| miette::miette!("parsing {graph_path}: {e}"))?;
    let scenario: Scenario = serde_json::from_str(&scenario_json)
        .map_err(|e| miette::miette!("parsing {scenario_path}: {e}"))?;

    let mut runner = ScenarioRunner::new(scenario, graph)?;
    let snapshot = runner.seek_to(at_ms);

    serde_json::to_string_pretty(&snapshot).map_err(|e| miette::miette!("serializing snapshot: {e}"))
}
