//! Static graph definition: the immutable topology the simulation runs over.
//!
//! A [`Graph`] is pure input — nodes and directed edges with no dynamic
//! state attached. Dynamic per-node status lives in
//! [`crate::model::node_state::NodeState`], keyed by the same node ids.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Static classification of an infrastructure element (e.g. client, region,
/// az, alb, db-primary, db-standby, edge-location). Kept as a `String`
/// rather than a closed enum so scenario authors can introduce new kinds
/// without a crate release.
pub type NodeKind = String;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub metadata: FxHashMap<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// Immutable input graph: a set of nodes and directed edges.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub id: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum GraphError {
    #[error("edge `{edge_id}` references unknown source node `{node_id}`")]
    #[diagnostic(
        code(infra_sim_core::graph::unknown_source),
        help("Add a node with id `{node_id}` or fix the edge's `source` field.")
    )]
    UnknownSource { edge_id: String, node_id: String },

    #[error("edge `{edge_id}` references unknown target node `{node_id}`")]
    #[diagnostic(
        code(infra_sim_core::graph::unknown_target),
        help("Add a node with id `{node_id}` or fix the edge's `target` field.")
    )]
    UnknownTarget { edge_id: String, node_id: String },

    #[error("duplicate node id `{node_id}`")]
    #[diagnostic(code(infra_sim_core::graph::duplicate_node))]
    DuplicateNode { node_id: String },
}

impl Graph {
    /// Validate that every edge references a node that exists and that node
    /// ids are unique. Fails fast at construction time rather than
    /// producing a graph the runner would have to paper over at every
    /// lookup.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut seen = FxHashSet::default();
        for node in &self.nodes {
            if !seen.insert(node.id.clone()) {
                return Err(GraphError::DuplicateNode {
                    node_id: node.id.clone(),
                });
            }
        }
        let ids: FxHashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        for edge in &self.edges {
            if !ids.contains(edge.source.as_str()) {
                return Err(GraphError::UnknownSource {
                    edge_id: edge.id.clone(),
                    node_id: edge.source.clone(),
                });
            }
            if !ids.contains(edge.target.as_str()) {
                return Err(GraphError::UnknownTarget {
                    edge_id: edge.id.clone(),
                    node_id: edge.target.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Outgoing edges from `node_id`, in declaration order.
    pub fn outgoing(&self, node_id: &str) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// The single incoming edge into `node_id`, if exactly one exists.
    ///
    /// Used by the `primary-aware` path selector to find a primary node's
    /// containing AZ/region; callers that need all incoming edges (there is
    /// more than one) should filter `edges` directly.
    pub fn single_incoming(&self, node_id: &str) -> Option<&GraphEdge> {
        let mut it = self.edges.iter().filter(|e| e.target == node_id);
        let first = it.next()?;
        if it.next().is_some() {
            None
        } else {
            Some(first)
        }
    }

    /// Adjacency map from node id to outgoing edge targets, built once and
    /// reused by algorithms that need repeated neighbor lookups (path
    /// selectors, fan-out strategies).
    pub fn adjacency(&self) -> FxHashMap<&str, Vec<&str>> {
        let mut map: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
        for edge in &self.edges {
            map.entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
        }
        map
    }
}
