//! Dynamic per-node state.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Available,
    Unavailable,
    Degraded,
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self::Available
    }
}

/// Dynamic state for one node. Absence of an entry in
/// `SimulationState.nodes` is equivalent to an implicit
/// `NodeState::default()` (status = available).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub status: NodeStatus,
    pub sublabel: Option<String>,
    #[serde(default)]
    pub metadata: FxHashMap<String, Value>,
    pub last_state_change_ms: u64,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            status: NodeStatus::Available,
            sublabel: None,
            metadata: FxHashMap::default(),
            last_state_change_ms: 0,
        }
    }
}

impl NodeState {
    pub fn is_available(&self) -> bool {
        matches!(self.status, NodeStatus::Available)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.status, NodeStatus::Unavailable)
    }

    /// The semantically significant `role` metadata key (e.g. "primary",
    /// "standby"), if set.
    pub fn role(&self) -> Option<&str> {
        self.metadata.get("role").and_then(Value::as_str)
    }

    pub fn set_role(&mut self, role: Option<&str>) {
        match role {
            Some(r) => {
                self.metadata
                    .insert("role".to_string(), Value::String(r.to_string()));
            }
            None => {
                self.metadata.remove("role");
            }
        }
    }
}
