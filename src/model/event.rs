//! Static timed events that drive the simulation forward.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventAction {
    Fail,
    Recover,
    Degrade,
    Promote,
    RouteRequest,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioEvent {
    pub id: String,
    pub timestamp_ms: u64,
    pub action: EventAction,
    pub target_id: String,
    pub target_kind: Option<String>,
    pub failure_message: Option<String>,
    pub flow_id: Option<String>,
    pub promotion_role: Option<String>,
}

impl ScenarioEvent {
    /// Total order over events: `(timestamp_ms, id)`. Equal timestamps
    /// tie-break by id's lexicographic (string) order, so replay order never
    /// depends on input declaration order.
    pub fn order_key(&self) -> (u64, &str) {
        (self.timestamp_ms, self.id.as_str())
    }
}

/// Sort a batch of events by their total order. Callers that already
/// receive events in scenario-declaration order still need this: events are
/// only *conceptually* totally ordered, the input `Vec` may not be
/// pre-sorted.
pub fn sort_events(events: &mut [ScenarioEvent]) {
    events.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
}
