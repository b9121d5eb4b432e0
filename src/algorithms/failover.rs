//! Failover strategies: given a primary path and a failed node, decide on
//! an alternative. Used by `StaticSelector`'s failover branch and by
//! scenario-authored composite strategies; never retries in-flight tokens.

use crate::managers::NodeManager;

use super::ExecutionContext;

pub trait FailoverStrategy: Send + Sync {
    fn alternative_path(
        &self,
        primary_path: &[String],
        failed_node_id: &str,
        failover_path: Option<&[String]>,
        ctx: &ExecutionContext,
    ) -> Option<Vec<String>>;
}

/// Uses `failover_path` verbatim if every one of its nodes is currently
/// available; otherwise returns none (the caller truncates at the failure
/// point itself).
pub struct DefaultFailover;

impl FailoverStrategy for DefaultFailover {
    fn alternative_path(
        &self,
        _primary_path: &[String],
        _failed_node_id: &str,
        failover_path: Option<&[String]>,
        ctx: &ExecutionContext,
    ) -> Option<Vec<String>> {
        let path = failover_path?;
        if path.iter().all(|n| NodeManager::is_available(ctx.store, n)) {
            Some(path.to_vec())
        } else {
            None
        }
    }
}
