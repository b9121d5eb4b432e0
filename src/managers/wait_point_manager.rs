//! WaitPointManager: the typed façade over the `wait_points` slice.

use crate::model::{WaitPointConfig, WaitPointState};
use crate::state::StateStore;

pub struct WaitPointManager;

impl WaitPointManager {
    /// Registers a wait point, replacing any prior config for the same node.
    pub fn setup(store: &mut StateStore, config: WaitPointConfig) {
        let node_id = config.node_id.clone();
        store.update_wait_points(|points| {
            let mut next = points.clone();
            next.insert(node_id.clone(), WaitPointState::new(config.clone()));
            next
        });
    }

    pub fn get<'a>(store: &'a StateStore, node_id: &str) -> Option<&'a WaitPointState> {
        store.get_state().wait_points.get().get(node_id)
    }

    pub fn has(store: &StateStore, node_id: &str) -> bool {
        store.get_state().wait_points.get().contains_key(node_id)
    }

    /// Appends `token_id` to the node's FIFO queue and returns its zero-based
    /// position. Idempotent: re-enqueuing a token already in the queue
    /// returns its existing position without moving it.
    pub fn enqueue(store: &mut StateStore, node_id: &str, token_id: &str) -> Option<usize> {
        if !Self::has(store, node_id) {
            return None;
        }
        let mut position = None;
        store.update_wait_points(|points| {
            let mut next = points.clone();
            if let Some(wp) = next.get_mut(node_id) {
                if let Some(idx) = wp.token_ids.iter().position(|t| t == token_id) {
                    position = Some(idx);
                } else {
                    wp.token_ids.push(token_id.to_string());
                    position = Some(wp.token_ids.len() - 1);
                }
            }
            next
        });
        position
    }

    /// Pops and returns the head of the queue if `now_ms` permits a release
    /// (`process_interval_ms` has elapsed since the last release), advancing
    /// `last_processed_ms`. Positions of remaining tokens shift down by one.
    pub fn dequeue(store: &mut StateStore, node_id: &str, now_ms: u64) -> Option<String> {
        let can = store
            .get_state()
            .wait_points
            .get()
            .get(node_id)
            .map(|wp| wp.can_release(now_ms))
            .unwrap_or(false);
        if !can {
            return None;
        }
        let mut released = None;
        store.update_wait_points(|points| {
            let mut next = points.clone();
            if let Some(wp) = next.get_mut(node_id) {
                if !wp.token_ids.is_empty() {
                    released = Some(wp.token_ids.remove(0));
                    wp.last_processed_ms = now_ms;
                }
            }
            next
        });
        released
    }

    pub fn remove_token(store: &mut StateStore, node_id: &str, token_id: &str) {
        store.update_wait_points(|points| {
            let mut next = points.clone();
            if let Some(wp) = next.get_mut(node_id) {
                wp.token_ids.retain(|t| t != token_id);
            }
            next
        });
    }

    pub fn can_release(store: &StateStore, node_id: &str, now_ms: u64) -> bool {
        store
            .get_state()
            .wait_points
            .get()
            .get(node_id)
            .map(|wp| wp.can_release(now_ms))
            .unwrap_or(false)
    }

    pub fn next_release_time(store: &StateStore, node_id: &str) -> Option<u64> {
        Some(
            store
                .get_state()
                .wait_points
                .get()
                .get(node_id)?
                .next_release_time(),
        )
    }

    /// Clears a node's queue without touching its config, used when a wait
    /// point's upstream node fails and its queued tokens are failed out
    /// by the caller first.
    pub fn reset_queue(store: &mut StateStore, node_id: &str) {
        store.update_wait_points(|points| {
            let mut next = points.clone();
            if let Some(wp) = next.get_mut(node_id) {
                wp.token_ids.clear();
            }
            next
        });
    }

    pub fn all(store: &StateStore) -> Vec<(String, WaitPointState)> {
        store
            .get_state()
            .wait_points
            .get()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
