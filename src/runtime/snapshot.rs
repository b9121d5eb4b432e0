//! The single read sink for consumers of a running simulation.

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::model::{NodeState, Token, WaitPointState};
use crate::state::StateStore;

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub time_ms: u64,
    pub nodes: Vec<(String, NodeState)>,
    pub tokens: Vec<Token>,
    pub wait_points: Vec<(String, WaitPointState)>,
    pub animating_edges: FxHashSet<String>,
    pub active_flow_id: Option<String>,
    pub processed_event_ids: FxHashSet<String>,
}

/// Active edges are always derived from live tokens, never from past
/// events, so they cannot drift from what's actually traveling:
/// - a traveling token contributes `path[edge_idx] -> path[edge_idx + 1]`.
/// - a waiting token contributes `path[edge_idx - 1] -> path[edge_idx]`
///   (the edge it just arrived over), when `edge_idx > 0`.
fn animating_edges(tokens: &[Token]) -> FxHashSet<String> {
    let mut edges = FxHashSet::default();
    for token in tokens {
        match token.status {
            crate::model::TokenStatus::Traveling => {
                if let Some(next) = token.next_node() {
                    edges.insert(format!("{}-{}", token.current_node(), next));
                }
            }
            crate::model::TokenStatus::Waiting => {
                if token.current_edge_index > 0 {
                    let prev = &token.path[token.current_edge_index - 1];
                    edges.insert(format!("{prev}-{}", token.current_node()));
                }
            }
            _ => {}
        }
    }
    edges
}

pub fn build(store: &StateStore, active_flow_id: Option<String>) -> Snapshot {
    let state = store.get_state();
    let tokens: Vec<Token> = state.tokens.get().values().cloned().collect();
    Snapshot {
        time_ms: store.current_time_ms(),
        nodes: state
            .nodes
            .get()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        animating_edges: animating_edges(&tokens),
        tokens,
        wait_points: state
            .wait_points
            .get()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        active_flow_id,
        processed_event_ids: state.processed_event_ids.get().clone(),
    }
}
