//! The token: a unit of work flowing through the graph.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
    Traveling,
    Waiting,
    Completed,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub type_id: String,
    pub path: Vec<String>,
    pub current_edge_index: usize,
    pub status: TokenStatus,
    pub emitted_at_ms: u64,
    pub current_segment_start_ms: u64,
    pub current_segment_duration_ms: u64,
    pub progress: f64,
    pub waiting_at_node: Option<String>,
    pub wait_position: Option<usize>,
    pub parent_token_id: Option<String>,
    pub child_token_ids: Vec<String>,
    /// Set the moment a token leaves `traveling`/`waiting`; used by the
    /// 800ms post-completion cleanup window.
    pub terminal_at_ms: Option<u64>,
}

impl Token {
    /// Construct a freshly-emitted traveling token for `path`, starting its
    /// first edge at `emitted_at_ms`. `path` must have at least two nodes;
    /// this precondition is enforced by callers at emission time, not
    /// re-checked here.
    pub fn emit(
        id: String,
        type_id: String,
        path: Vec<String>,
        emitted_at_ms: u64,
        first_segment_duration_ms: u64,
    ) -> Self {
        Self {
            id,
            type_id,
            path,
            current_edge_index: 0,
            status: TokenStatus::Traveling,
            emitted_at_ms,
            current_segment_start_ms: emitted_at_ms,
            current_segment_duration_ms: first_segment_duration_ms,
            progress: 0.0,
            waiting_at_node: None,
            wait_position: None,
            parent_token_id: None,
            child_token_ids: Vec::new(),
            terminal_at_ms: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TokenStatus::Completed | TokenStatus::Failed)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, TokenStatus::Traveling | TokenStatus::Waiting)
    }

    /// `current_edge_index < |path|-1` — i.e. there is a next node to reach.
    pub fn has_next_node(&self) -> bool {
        self.current_edge_index + 1 < self.path.len()
    }

    pub fn current_node(&self) -> &str {
        &self.path[self.current_edge_index]
    }

    pub fn next_node(&self) -> Option<&str> {
        self.path.get(self.current_edge_index + 1).map(String::as_str)
    }
}
