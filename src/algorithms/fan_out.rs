//! Fan-out strategies: decide whether and how a token replicates at a node.

use crate::managers::NodeManager;
use crate::model::FanOutConfig;

use super::ExecutionContext;

/// One child path per replica, plus the quorum needed among them for the
/// parent to complete.
pub struct FanOutResult {
    pub should_fan_out: bool,
    pub child_paths: Vec<Vec<String>>,
    pub quorum_required: usize,
}

impl FanOutResult {
    pub fn none() -> Self {
        Self {
            should_fan_out: false,
            child_paths: Vec::new(),
            quorum_required: 0,
        }
    }
}

pub trait FanOutStrategy: Send + Sync {
    fn compute_fan_out(
        &self,
        node_id: &str,
        ctx: &ExecutionContext,
        config: &FanOutConfig,
    ) -> FanOutResult;
}

/// Fans out only from nodes matching `config.node_roles` (live
/// `metadata.role`) or `config.node_types` (static kind); requires at least
/// one role/type to be configured. Skips unavailable targets entirely.
pub struct QuorumReplication;

impl FanOutStrategy for QuorumReplication {
    fn compute_fan_out(
        &self,
        node_id: &str,
        ctx: &ExecutionContext,
        config: &FanOutConfig,
    ) -> FanOutResult {
        if config.node_roles.is_empty() && config.node_types.is_empty() {
            return FanOutResult::none();
        }
        let role_matches = NodeManager::get(ctx.store, node_id)
            .and_then(|n| n.role())
            .is_some_and(|r| config.node_roles.iter().any(|wanted| wanted == r));
        let type_matches = ctx
            .graph
            .node(node_id)
            .is_some_and(|n| config.node_types.iter().any(|wanted| wanted == &n.kind));
        if !role_matches && !type_matches {
            return FanOutResult::none();
        }

        let children: Vec<Vec<String>> = ctx
            .graph
            .outgoing(node_id)
            .filter(|e| NodeManager::is_available(ctx.store, &e.target))
            .map(|e| vec![node_id.to_string(), e.target.clone()])
            .collect();
        if children.is_empty() {
            return FanOutResult::none();
        }
        let quorum = config
            .quorum_required
            .unwrap_or_else(|| children.len().div_ceil(2))
            .min(children.len());
        FanOutResult {
            should_fan_out: true,
            child_paths: children,
            quorum_required: quorum,
        }
    }
}

/// Always fans out to every outgoing edge, including unavailable targets —
/// those children are birthed as `failed`. Requires the full child count to
/// reach quorum.
pub struct BroadcastReplication;

impl FanOutStrategy for BroadcastReplication {
    fn compute_fan_out(
        &self,
        node_id: &str,
        ctx: &ExecutionContext,
        _config: &FanOutConfig,
    ) -> FanOutResult {
        let children: Vec<Vec<String>> = ctx
            .graph
            .outgoing(node_id)
            .map(|e| vec![node_id.to_string(), e.target.clone()])
            .collect();
        if children.is_empty() {
            return FanOutResult::none();
        }
        let quorum = children.len();
        FanOutResult {
            should_fan_out: true,
            child_paths: children,
            quorum_required: quorum,
        }
    }
}

pub struct NoFanOut;

impl FanOutStrategy for NoFanOut {
    fn compute_fan_out(
        &self,
        _node_id: &str,
        _ctx: &ExecutionContext,
        _config: &FanOutConfig,
    ) -> FanOutResult {
        FanOutResult::none()
    }
}
