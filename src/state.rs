//! The immutable state store with checkpointing.
//!
//! `SimulationState` is five logically-immutable slices; replacing one
//! produces a new `SimulationState` that shares every other slice's `Arc`
//! identity (see [`crate::channels::Slice`]). `StateStore` owns the current
//! state plus a time-sorted checkpoint log that supports O(log N) restore.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::algorithms::state::AlgorithmValue;
use crate::channels::Slice;
use crate::model::{NodeState, Token, WaitPointState};

pub type NodeMap = FxHashMap<String, NodeState>;
pub type TokenMap = FxHashMap<String, Token>;
pub type WaitPointMap = FxHashMap<String, WaitPointState>;
pub type ProcessedEventSet = FxHashSet<String>;
pub type AlgorithmStateMap = FxHashMap<String, AlgorithmValue>;

/// Composite simulation state.
#[derive(Clone, Debug, Default)]
pub struct SimulationState {
    pub nodes: Slice<NodeMap>,
    pub tokens: Slice<TokenMap>,
    pub wait_points: Slice<WaitPointMap>,
    pub processed_event_ids: Slice<ProcessedEventSet>,
    pub algorithm_state: Slice<AlgorithmStateMap>,
}

/// A `(time_ms, state)` pair appended to the checkpoint log.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    pub time_ms: u64,
    pub state: SimulationState,
}

/// The time a `restore_to` call actually landed on — may be earlier than
/// the requested target if no checkpoint exists at or before it.
pub type CheckpointTime = u64;

/// Immutable state store with a time-sorted checkpoint log.
#[derive(Clone, Debug)]
pub struct StateStore {
    initial: SimulationState,
    current: SimulationState,
    current_time_ms: u64,
    checkpoints: Vec<Checkpoint>,
}

impl StateStore {
    pub fn new(initial: SimulationState) -> Self {
        Self {
            initial: initial.clone(),
            current: initial,
            current_time_ms: 0,
            checkpoints: Vec::new(),
        }
    }

    pub fn get_state(&self) -> &SimulationState {
        &self.current
    }

    pub fn get_initial_state(&self) -> &SimulationState {
        &self.initial
    }

    pub fn current_time_ms(&self) -> u64 {
        self.current_time_ms
    }

    pub fn set_time_ms(&mut self, t: u64) {
        self.current_time_ms = t;
    }

    pub fn update_nodes(&mut self, updater: impl FnOnce(&NodeMap) -> NodeMap) {
        self.current.nodes = self.current.nodes.replace_if_changed(updater);
    }

    pub fn update_tokens(&mut self, updater: impl FnOnce(&TokenMap) -> TokenMap) {
        self.current.tokens = self.current.tokens.replace_if_changed(updater);
    }

    pub fn update_wait_points(&mut self, updater: impl FnOnce(&WaitPointMap) -> WaitPointMap) {
        self.current.wait_points = self.current.wait_points.replace_if_changed(updater);
    }

    pub fn update_processed_event_ids(
        &mut self,
        updater: impl FnOnce(&ProcessedEventSet) -> ProcessedEventSet,
    ) {
        self.current.processed_event_ids =
            self.current.processed_event_ids.replace_if_changed(updater);
    }

    pub fn update_algorithm_state(
        &mut self,
        updater: impl FnOnce(&AlgorithmStateMap) -> AlgorithmStateMap,
    ) {
        self.current.algorithm_state = self.current.algorithm_state.replace_if_changed(updater);
    }

    /// Append `(time_ms, current_state)` to the log. Checkpoints must arrive
    /// in non-decreasing time order; a duplicate time is permitted and the
    /// later append wins on restore. An out-of-order call is a logic
    /// anomaly: it is diagnosed, not rejected — the store has no other way
    /// to refuse it and stay total.
    pub fn checkpoint(&mut self, time_ms: u64) {
        if let Some(last) = self.checkpoints.last() {
            if time_ms < last.time_ms {
                tracing::warn!(
                    requested_ms = time_ms,
                    last_ms = last.time_ms,
                    "checkpoint time moved backwards; appending anyway"
                );
            }
        }
        self.checkpoints.push(Checkpoint {
            time_ms,
            state: self.current.clone(),
        });
    }

    /// Binary-search the log for the greatest checkpoint with
    /// `time_ms <= target_ms`; if none (or `target_ms < 0`), restore the
    /// initial state at time 0. Returns the actual checkpoint time used.
    /// O(log N) in the number of checkpoints.
    pub fn restore_to(&mut self, target_ms: i64) -> CheckpointTime {
        if target_ms < 0 {
            self.current = self.initial.clone();
            self.current_time_ms = 0;
            return 0;
        }
        let target = target_ms as u64;
        // checkpoints are appended in non-decreasing time order, so the
        // "time_ms <= target" predicate is true for a prefix of the slice;
        // partition_point finds that prefix's length in O(log N).
        let count = self.checkpoints.partition_point(|c| c.time_ms <= target);
        if count == 0 {
            self.current = self.initial.clone();
            self.current_time_ms = 0;
            0
        } else {
            let cp = &self.checkpoints[count - 1];
            self.current = cp.state.clone();
            self.current_time_ms = cp.time_ms;
            cp.time_ms
        }
    }

    pub fn clear_checkpoints(&mut self) {
        self.checkpoints.clear();
    }

    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }
}
