//! NodeManager: the typed façade over the `nodes` slice.

use crate::model::{NodeState, NodeStatus};
use crate::state::StateStore;

pub struct NodeManager;

impl NodeManager {
    /// Absence of an entry means implicit `NodeState::default()` (available)
    /// — this returns the stored entry only, callers that need the
    /// "effective" state should use [`Self::effective`].
    pub fn get<'a>(store: &'a StateStore, id: &str) -> Option<&'a NodeState> {
        store.get_state().nodes.get().get(id)
    }

    /// The node's effective state: the stored entry, or a default
    /// `available` state if the node has never been written to.
    pub fn effective(store: &StateStore, id: &str) -> NodeState {
        store
            .get_state()
            .nodes
            .get()
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has(store: &StateStore, id: &str) -> bool {
        store.get_state().nodes.get().contains_key(id)
    }

    pub fn count(store: &StateStore) -> usize {
        store.get_state().nodes.get().len()
    }

    pub fn all(store: &StateStore) -> Vec<(String, NodeState)> {
        store
            .get_state()
            .nodes
            .get()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Create-or-update: applies `changes` to the node's effective state,
    /// created lazily if absent.
    pub fn update(store: &mut StateStore, id: &str, changes: impl FnOnce(&mut NodeState)) {
        store.update_nodes(|nodes| {
            let mut next = nodes.clone();
            let entry = next.entry(id.to_string()).or_default();
            changes(entry);
            next
        });
    }

    pub fn set(store: &mut StateStore, id: &str, state: NodeState) {
        store.update_nodes(|nodes| {
            let mut next = nodes.clone();
            next.insert(id.to_string(), state.clone());
            next
        });
    }

    pub fn remove(store: &mut StateStore, id: &str) {
        store.update_nodes(|nodes| {
            if !nodes.contains_key(id) {
                return nodes.clone();
            }
            let mut next = nodes.clone();
            next.remove(id);
            next
        });
    }

    pub fn is_available(store: &StateStore, id: &str) -> bool {
        Self::effective(store, id).is_available()
    }

    pub fn is_unavailable(store: &StateStore, id: &str) -> bool {
        Self::effective(store, id).is_unavailable()
    }

    /// Convenience mutator: mark `id` unavailable.
    pub fn fail(store: &mut StateStore, id: &str, now_ms: u64, sublabel: Option<String>) {
        Self::update(store, id, |n| {
            n.status = NodeStatus::Unavailable;
            n.sublabel = sublabel;
            n.last_state_change_ms = now_ms;
        });
    }

    /// Convenience mutator: mark `id` available, clearing its sublabel.
    pub fn recover(store: &mut StateStore, id: &str, now_ms: u64) {
        Self::update(store, id, |n| {
            n.status = NodeStatus::Available;
            n.sublabel = None;
            n.last_state_change_ms = now_ms;
        });
    }

    /// Convenience mutator: mark `id` degraded.
    pub fn degrade(store: &mut StateStore, id: &str, now_ms: u64, sublabel: Option<String>) {
        Self::update(store, id, |n| {
            n.status = NodeStatus::Degraded;
            n.sublabel = Some(sublabel.unwrap_or_else(|| "Degraded".to_string()));
            n.last_state_change_ms = now_ms;
        });
    }
}
