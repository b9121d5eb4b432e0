//! Per-node FIFO throttling queues.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitStrategy {
    Fifo,
    Priority,
    Batch,
}

impl Default for WaitStrategy {
    fn default() -> Self {
        Self::Fifo
    }
}

/// Scenario-authored configuration for a wait point
/// (`TokenFlowConfig.wait_points`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPointConfig {
    pub node_id: String,
    pub process_interval_ms: u64,
    #[serde(default)]
    pub strategy: WaitStrategy,
    pub capacity: Option<usize>,
}

/// Dynamic queue state for one wait point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPointState {
    pub node_id: String,
    pub token_ids: Vec<String>,
    pub last_processed_ms: u64,
    pub config: WaitPointConfig,
}

impl WaitPointState {
    pub fn new(config: WaitPointConfig) -> Self {
        Self {
            node_id: config.node_id.clone(),
            token_ids: Vec::new(),
            last_processed_ms: 0,
            config,
        }
    }

    pub fn is_full(&self) -> bool {
        match self.config.capacity {
            Some(cap) => self.token_ids.len() >= cap,
            None => false,
        }
    }

    pub fn can_release(&self, now_ms: u64) -> bool {
        !self.token_ids.is_empty()
            && now_ms >= self.last_processed_ms + self.config.process_interval_ms
    }

    pub fn next_release_time(&self) -> u64 {
        self.last_processed_ms + self.config.process_interval_ms
    }
}
