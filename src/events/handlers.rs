//! The five event handlers. Each is pure over `(event, ctx)`: it reads the
//! current state through `ctx.store` and returns a delta; it never mutates
//! anything itself. The runner applies the returned [`EventResult`] through
//! the managers so every consumer-visible change stays atomic per event.

use crate::algorithms::ExecutionContext;
use crate::managers::NodeManager;
use crate::model::{EventAction, NodeStatus, ScenarioEvent};
use crate::state::StateStore;

/// A per-node partial update. `Some(None)` means "clear this field";
/// `None` means "leave it alone" — distinct from `Some(Some(_))`, "set it".
#[derive(Clone, Debug, Default)]
pub struct NodeDelta {
    pub node_id: String,
    pub status: Option<NodeStatus>,
    pub sublabel: Option<Option<String>>,
    pub role: Option<Option<String>>,
}

#[derive(Clone, Debug, Default)]
pub struct EventResult {
    pub node_changes: Vec<NodeDelta>,
    pub active_flow_id: Option<String>,
    /// Only populated by `route-request`.
    pub computed_path: Option<Vec<String>>,
}

fn default_sublabel_for(target_kind: Option<&str>) -> String {
    match target_kind {
        Some(kind) => format!("{kind} unavailable"),
        None => "Unavailable".to_string(),
    }
}

/// Writes every [`NodeDelta`] in `result` through [`NodeManager`]. Called by
/// the runner once per processed event, after `handle` returned.
pub fn apply(store: &mut StateStore, result: &EventResult, now_ms: u64) {
    for delta in &result.node_changes {
        NodeManager::update(store, &delta.node_id, |n| {
            if let Some(status) = delta.status {
                n.status = status;
            }
            if let Some(sublabel) = &delta.sublabel {
                n.sublabel = sublabel.clone();
            }
            if let Some(role) = &delta.role {
                n.set_role(role.as_deref());
            }
            n.last_state_change_ms = now_ms;
        });
    }
}

pub fn handle(event: &ScenarioEvent, ctx: &ExecutionContext) -> EventResult {
    match event.action {
        EventAction::Fail => handle_fail(event),
        EventAction::Recover => handle_recover(event),
        EventAction::Degrade => handle_degrade(event),
        EventAction::Promote => handle_promote(event, ctx),
        EventAction::RouteRequest => handle_route_request(event, ctx),
    }
}

fn handle_fail(event: &ScenarioEvent) -> EventResult {
    let sublabel = event
        .failure_message
        .clone()
        .unwrap_or_else(|| default_sublabel_for(event.target_kind.as_deref()));
    EventResult {
        node_changes: vec![NodeDelta {
            node_id: event.target_id.clone(),
            status: Some(NodeStatus::Unavailable),
            sublabel: Some(Some(sublabel)),
            role: None,
        }],
        ..Default::default()
    }
}

fn handle_recover(event: &ScenarioEvent) -> EventResult {
    EventResult {
        node_changes: vec![NodeDelta {
            node_id: event.target_id.clone(),
            status: Some(NodeStatus::Available),
            sublabel: Some(None),
            role: None,
        }],
        ..Default::default()
    }
}

fn handle_degrade(event: &ScenarioEvent) -> EventResult {
    let sublabel = event.failure_message.clone().unwrap_or_else(|| "Degraded".to_string());
    EventResult {
        node_changes: vec![NodeDelta {
            node_id: event.target_id.clone(),
            status: Some(NodeStatus::Degraded),
            sublabel: Some(Some(sublabel)),
            role: None,
        }],
        ..Default::default()
    }
}

/// Promotes `target` to `event.promotion_role` (default `"primary"`),
/// demoting every other node currently holding that role value to
/// `"standby"` when the new role is `"primary"`. The target's sublabel
/// becomes `"Primary"` iff the new role is `"primary"`; demoted nodes have
/// their sublabel cleared.
fn handle_promote(event: &ScenarioEvent, ctx: &ExecutionContext) -> EventResult {
    let new_role = event.promotion_role.clone().unwrap_or_else(|| "primary".to_string());
    let mut changes = Vec::new();

    if new_role == "primary" {
        for (id, state) in ctx.store.get_state().nodes.get().iter() {
            if id != &event.target_id && state.role() == Some("primary") {
                changes.push(NodeDelta {
                    node_id: id.clone(),
                    status: None,
                    sublabel: Some(None),
                    role: Some(Some("standby".to_string())),
                });
            }
        }
    }

    changes.push(NodeDelta {
        node_id: event.target_id.clone(),
        status: Some(NodeStatus::Available),
        sublabel: if new_role == "primary" {
            Some(Some("Primary".to_string()))
        } else {
            None
        },
        role: Some(Some(new_role)),
    });

    EventResult {
        node_changes: changes,
        ..Default::default()
    }
}

/// Locates the `RequestFlow` by explicit `flow_id` or by target match, runs
/// the configured path selector (defaulting to `static`), marks every
/// available node on the computed path as participating in the active flow,
/// and returns the path for the runner to emit a token from.
fn handle_route_request(event: &ScenarioEvent, ctx: &ExecutionContext) -> EventResult {
    let Some(flow) = ctx
        .scenario
        .flow_for_event(event.flow_id.as_deref(), &event.target_id)
    else {
        return EventResult::default();
    };

    let path = ctx.path_selector().compute_path(flow, ctx);

    EventResult {
        node_changes: Vec::new(),
        active_flow_id: Some(flow.id.clone()),
        computed_path: Some(path),
    }
}
