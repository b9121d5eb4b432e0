//! Path selectors: compute the node sequence a newly-routed request travels.

use crate::managers::NodeManager;
use crate::model::RequestFlow;

use super::ExecutionContext;

pub trait PathSelector: Send + Sync {
    fn compute_path(&self, flow: &RequestFlow, ctx: &ExecutionContext) -> Vec<String>;
}

/// Returns `flow.path` verbatim, failing over at the first unavailable node.
///
/// If every node on `failover_path` is currently available, that path is
/// used instead; otherwise the primary path is truncated up to and
/// including the first unavailable node (the emitted token then fails on
/// arrival there).
pub struct StaticSelector;

impl PathSelector for StaticSelector {
    fn compute_path(&self, flow: &RequestFlow, ctx: &ExecutionContext) -> Vec<String> {
        static_path(flow, ctx)
    }
}

fn static_path(flow: &RequestFlow, ctx: &ExecutionContext) -> Vec<String> {
    let Some(path) = flow.path.as_ref() else {
        return Vec::new();
    };
    let first_unavailable = path
        .iter()
        .position(|n| !NodeManager::is_available(ctx.store, n));
    let Some(idx) = first_unavailable else {
        return path.clone();
    };
    if let Some(failover) = &flow.failover_path {
        if failover
            .iter()
            .all(|n| NodeManager::is_available(ctx.store, n))
        {
            return failover.clone();
        }
    }
    path[..=idx].to_vec()
}

/// Picks among `flow.path_constraints.candidates` using the scenario's
/// configured load balancer, substituting the choice into the base path
/// ("replace mode") if a candidate id already appears there, or appending
/// it plus its first available outgoing neighbor ("append mode") otherwise.
/// Falls back to [`StaticSelector`] when the flow defines no candidates.
pub struct HealthiestSelector;

impl PathSelector for HealthiestSelector {
    fn compute_path(&self, flow: &RequestFlow, ctx: &ExecutionContext) -> Vec<String> {
        let Some(candidates) = flow.candidates() else {
            return static_path(flow, ctx);
        };
        if candidates.is_empty() {
            return static_path(flow, ctx);
        }
        let chosen = ctx.load_balancer().select_node(candidates, ctx);
        let base = flow.path.clone().unwrap_or_default();
        if let Some(replace_idx) = base.iter().position(|n| candidates.contains(n)) {
            let mut next = base;
            next[replace_idx] = chosen;
            next
        } else {
            let mut next = base;
            next.push(chosen.clone());
            if let Some(child) = ctx
                .graph
                .outgoing(&chosen)
                .map(|e| e.target.as_str())
                .find(|t| NodeManager::is_available(ctx.store, t))
            {
                next.push(child.to_string());
            }
            next
        }
    }
}

/// Routes to the unique node carrying `metadata.role = "primary"` via its
/// containing AZ/region (its single incoming edge's source). Truncates at
/// the container if it is unavailable; otherwise appends
/// `[container, primary]` to the flow's base path. Falls back to
/// [`StaticSelector`] when no primary node exists.
pub struct PrimaryAwareSelector;

impl PathSelector for PrimaryAwareSelector {
    fn compute_path(&self, flow: &RequestFlow, ctx: &ExecutionContext) -> Vec<String> {
        let primary = ctx
            .store
            .get_state()
            .nodes
            .get()
            .iter()
            .find(|(_, state)| state.role() == Some("primary"))
            .map(|(id, _)| id.clone());
        let Some(primary_id) = primary else {
            return static_path(flow, ctx);
        };
        let Some(container_edge) = ctx.graph.single_incoming(&primary_id) else {
            return static_path(flow, ctx);
        };
        let container = container_edge.source.clone();
        let mut base = flow.path.clone().unwrap_or_default();
        if !NodeManager::is_available(ctx.store, &container) {
            base.push(container);
            return base;
        }
        base.push(container);
        base.push(primary_id);
        base
    }
}

/// Placeholder: delegates to [`HealthiestSelector`].
pub struct GeoAwareSelector;

impl PathSelector for GeoAwareSelector {
    fn compute_path(&self, flow: &RequestFlow, ctx: &ExecutionContext) -> Vec<String> {
        HealthiestSelector.compute_path(flow, ctx)
    }
}
