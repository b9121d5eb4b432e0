//! Static scenario input: topology-independent configuration for a run.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::event::ScenarioEvent;
use super::wait_point::WaitPointConfig;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeTiming {
    pub source: String,
    pub target: String,
    pub duration_ms: u64,
}

/// Default edge duration, per-edge overrides, wait-point configs, and the
/// token-type palette.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFlowConfig {
    pub default_edge_duration_ms: u64,
    #[serde(default)]
    pub edge_timings: Vec<EdgeTiming>,
    #[serde(default)]
    pub wait_points: Vec<WaitPointConfig>,
    #[serde(default = "default_token_types")]
    pub token_types: Vec<String>,
}

fn default_token_types() -> Vec<String> {
    vec!["http-request".to_string()]
}

impl Default for TokenFlowConfig {
    fn default() -> Self {
        Self {
            default_edge_duration_ms: 500,
            edge_timings: Vec::new(),
            wait_points: Vec::new(),
            token_types: default_token_types(),
        }
    }
}

impl TokenFlowConfig {
    /// Duration of the edge `source -> target`, honoring per-edge overrides
    /// before falling back to `default_edge_duration_ms`.
    pub fn edge_duration(&self, source: &str, target: &str) -> u64 {
        self.edge_timings
            .iter()
            .find(|t| t.source == source && t.target == target)
            .map(|t| t.duration_ms)
            .unwrap_or(self.default_edge_duration_ms)
    }

    /// The scenario's first-configured token type, used as the default for
    /// tokens emitted by `route-request`.
    pub fn default_token_type(&self) -> &str {
        self.token_types.first().map(String::as_str).unwrap_or("http-request")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathConstraints {
    pub candidates: Option<Vec<String>>,
    pub excluded_nodes: Option<Vec<String>>,
    pub preferred_az: Option<String>,
}

/// A named request pattern referenced by `route-request` events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFlow {
    pub id: String,
    pub source_location: String,
    pub target_service_id: String,
    pub path: Option<Vec<String>>,
    pub failover_path: Option<Vec<String>>,
    pub path_constraints: Option<PathConstraints>,
    pub queue_at_nodes: Option<Vec<String>>,
}

impl RequestFlow {
    pub fn candidates(&self) -> Option<&[String]> {
        self.path_constraints
            .as_ref()
            .and_then(|c| c.candidates.as_deref())
    }
}

/// Fan-out strategy config (`quorum-replication`/`broadcast-replication`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanOutConfig {
    #[serde(default)]
    pub node_roles: Vec<String>,
    #[serde(default)]
    pub node_types: Vec<String>,
    pub quorum_required: Option<usize>,
    pub child_type_id: Option<String>,
}

/// Load-balancer strategy config (`weighted`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerConfig {
    #[serde(default)]
    pub weights: FxHashMap<String, u32>,
}

/// Named strategy selection for each algorithm category, plus their
/// per-category configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmsConfig {
    pub path_selector: Option<String>,
    pub load_balancer: Option<String>,
    #[serde(default)]
    pub load_balancer_config: LoadBalancerConfig,
    pub failover: Option<String>,
    pub consensus: Option<String>,
    pub fan_out: Option<String>,
    #[serde(default)]
    pub fan_out_config: FanOutConfig,
}

/// Top-level scenario input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub graph_id: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
    #[serde(default)]
    pub request_flows: Vec<RequestFlow>,
    pub token_flow_config: Option<TokenFlowConfig>,
    /// Opaque, rendering-only particle styling. Passed through unexamined
    /// so JSON round-trips losslessly.
    #[serde(default)]
    pub particle_config: Option<serde_json::Value>,
    pub algorithms: Option<AlgorithmsConfig>,
    /// Opaque AWS world-map context; the kernel never makes real AWS calls.
    #[serde(default)]
    pub aws_context: Option<serde_json::Value>,
}

impl Scenario {
    pub fn token_flow_config(&self) -> TokenFlowConfig {
        self.token_flow_config.clone().unwrap_or_default()
    }

    pub fn algorithms(&self) -> AlgorithmsConfig {
        self.algorithms.clone().unwrap_or_default()
    }

    pub fn flow(&self, id: &str) -> Option<&RequestFlow> {
        self.request_flows.iter().find(|f| f.id == id)
    }

    /// Locate a flow by explicit id, falling back to matching the event's
    /// target against a flow's `target_service_id`.
    pub fn flow_for_event(&self, flow_id: Option<&str>, target_id: &str) -> Option<&RequestFlow> {
        if let Some(id) = flow_id {
            if let Some(flow) = self.flow(id) {
                return Some(flow);
            }
        }
        self.request_flows
            .iter()
            .find(|f| f.target_service_id == target_id)
    }
}
