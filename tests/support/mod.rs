//! Shared scenario/graph builders for the integration test suite.

use infra_sim_core::graph::{Graph, GraphEdge, GraphNode};
use infra_sim_core::model::{
    AlgorithmsConfig, EdgeTiming, EventAction, FanOutConfig, LoadBalancerConfig, RequestFlow,
    Scenario, ScenarioEvent, TokenFlowConfig,
};
use rustc_hash::FxHashMap;

/// Builds a [`Graph`] from `(id, kind)` node pairs and `(source, target)`
/// edges; edge ids are derived as `"{source}-{target}"`.
pub fn graph(id: &str, nodes: &[(&str, &str)], edges: &[(&str, &str)]) -> Graph {
    Graph {
        id: id.to_string(),
        nodes: nodes
            .iter()
            .map(|(node_id, kind)| GraphNode {
                id: node_id.to_string(),
                label: node_id.to_string(),
                kind: kind.to_string(),
                metadata: FxHashMap::default(),
            })
            .collect(),
        edges: edges
            .iter()
            .map(|(source, target)| GraphEdge {
                id: format!("{source}-{target}"),
                source: source.to_string(),
                target: target.to_string(),
            })
            .collect(),
    }
}

pub fn path(nodes: &[&str]) -> Vec<String> {
    nodes.iter().map(|n| n.to_string()).collect()
}

pub fn fail_event(id: &str, timestamp_ms: u64, target_id: &str) -> ScenarioEvent {
    ScenarioEvent {
        id: id.to_string(),
        timestamp_ms,
        action: EventAction::Fail,
        target_id: target_id.to_string(),
        target_kind: None,
        failure_message: None,
        flow_id: None,
        promotion_role: None,
    }
}

pub fn recover_event(id: &str, timestamp_ms: u64, target_id: &str) -> ScenarioEvent {
    ScenarioEvent {
        id: id.to_string(),
        timestamp_ms,
        action: EventAction::Recover,
        target_id: target_id.to_string(),
        target_kind: None,
        failure_message: None,
        flow_id: None,
        promotion_role: None,
    }
}

pub fn promote_event(id: &str, timestamp_ms: u64, target_id: &str, role: &str) -> ScenarioEvent {
    ScenarioEvent {
        id: id.to_string(),
        timestamp_ms,
        action: EventAction::Promote,
        target_id: target_id.to_string(),
        target_kind: None,
        failure_message: None,
        flow_id: None,
        promotion_role: Some(role.to_string()),
    }
}

pub fn route_request_event(id: &str, timestamp_ms: u64, target_id: &str) -> ScenarioEvent {
    ScenarioEvent {
        id: id.to_string(),
        timestamp_ms,
        action: EventAction::RouteRequest,
        target_id: target_id.to_string(),
        target_kind: None,
        failure_message: None,
        flow_id: None,
        promotion_role: None,
    }
}

pub fn flow(id: &str, target_service_id: &str, base_path: &[&str]) -> RequestFlow {
    RequestFlow {
        id: id.to_string(),
        source_location: base_path.first().copied().unwrap_or_default().to_string(),
        target_service_id: target_service_id.to_string(),
        path: Some(path(base_path)),
        failover_path: None,
        path_constraints: None,
        queue_at_nodes: None,
    }
}

/// A scenario with a flat default edge duration and no special algorithm
/// selection; callers mutate the returned value's fields for their test.
pub fn bare_scenario(id: &str, graph_id: &str, duration_ms: u64) -> Scenario {
    Scenario {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        graph_id: graph_id.to_string(),
        duration_ms,
        events: Vec::new(),
        request_flows: Vec::new(),
        token_flow_config: Some(TokenFlowConfig {
            default_edge_duration_ms: 500,
            edge_timings: Vec::new(),
            wait_points: Vec::new(),
            token_types: vec!["http-request".to_string()],
        }),
        particle_config: None,
        algorithms: Some(AlgorithmsConfig::default()),
        aws_context: None,
    }
}

pub fn edge_timing(source: &str, target: &str, duration_ms: u64) -> EdgeTiming {
    EdgeTiming {
        source: source.to_string(),
        target: target.to_string(),
        duration_ms,
    }
}

pub fn with_fan_out(mut scenario: Scenario, strategy_id: &str, config: FanOutConfig) -> Scenario {
    let mut algorithms = scenario.algorithms.take().unwrap_or_default();
    algorithms.fan_out = Some(strategy_id.to_string());
    algorithms.fan_out_config = config;
    scenario.algorithms = Some(algorithms);
    scenario
}

pub fn with_path_selector(mut scenario: Scenario, selector_id: &str) -> Scenario {
    let mut algorithms = scenario.algorithms.take().unwrap_or_default();
    algorithms.path_selector = Some(selector_id.to_string());
    scenario.algorithms = Some(algorithms);
    scenario
}

pub fn with_load_balancer_config(mut scenario: Scenario, config: LoadBalancerConfig) -> Scenario {
    let mut algorithms = scenario.algorithms.take().unwrap_or_default();
    algorithms.load_balancer_config = config;
    scenario.algorithms = Some(algorithms);
    scenario
}
