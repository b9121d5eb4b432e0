//! Typed persistent per-algorithm state.
//!
//! Rather than a heterogeneous `Map<string, unknown>`, algorithms persist
//! their state under a typed key; `AlgorithmValue` is the per-entry type and
//! the map itself (`FxHashMap<String, AlgorithmValue>`) stays opaque to the
//! store.

use serde::{Deserialize, Serialize};

/// Deterministic PRNG state: a ChaCha8 seed plus the number of draws taken
/// so far. Reconstructing the RNG from `(seed, draws)` and fast-forwarding
/// is what makes the `weighted` load balancer seek-independent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub draws: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AlgorithmValue {
    /// Round-robin cursor, least-connections selection count, etc.
    Counter(u64),
    /// Required quorum size for a waiting parent token, keyed
    /// `"quorum:{parent_id}"`.
    Quorum(usize),
    Rng(RngState),
}

impl AlgorithmValue {
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            Self::Counter(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_quorum(&self) -> Option<usize> {
        match self {
            Self::Quorum(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_rng(&self) -> Option<RngState> {
        match self {
            Self::Rng(r) => Some(*r),
            _ => None,
        }
    }
}

pub fn quorum_key(parent_id: &str) -> String {
    format!("quorum:{parent_id}")
}

pub fn round_robin_key(category: &str, id: &str) -> String {
    format!("rr:{category}:{id}")
}

pub fn least_connections_key(category: &str, id: &str, node_id: &str) -> String {
    format!("lc:{category}:{id}:{node_id}")
}

pub fn weighted_rng_key(category: &str, id: &str) -> String {
    format!("rng:{category}:{id}")
}
