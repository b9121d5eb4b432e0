//! The continuous-time token advancer: per-edge latency, wait-point
//! scheduling, fan-out quorum checks, and the 800ms post-terminal cleanup.

use rustc_hash::FxHashMap;

use crate::algorithms::state::{self, AlgorithmValue};
use crate::algorithms::{AlgorithmRegistry, ExecutionContext, FanOutResult};
use crate::graph::Graph;
use crate::managers::{NodeManager, TokenManager, WaitPointManager};
use crate::model::{AlgorithmsConfig, FanOutConfig, Scenario, Token, TokenFlowConfig, TokenStatus};
use crate::state::StateStore;

const MAX_FIXED_POINT_ITERATIONS: usize = 100;
const CLEANUP_WINDOW_MS: u64 = 800;

/// Everything the advancer needs that doesn't change within one call to
/// [`advance_tokens`], plus the monotonic counter new child tokens draw
/// their ids from.
pub struct AdvanceContext<'a> {
    pub graph: &'a Graph,
    pub scenario: &'a Scenario,
    pub registry: &'a AlgorithmRegistry,
    pub algorithms: AlgorithmsConfig,
    pub token_flow: TokenFlowConfig,
    pub next_token_id: &'a mut u64,
}

impl<'a> AdvanceContext<'a> {
    pub fn new(
        graph: &'a Graph,
        scenario: &'a Scenario,
        registry: &'a AlgorithmRegistry,
        next_token_id: &'a mut u64,
    ) -> Self {
        Self {
            algorithms: scenario.algorithms(),
            token_flow: scenario.token_flow_config(),
            graph,
            scenario,
            registry,
            next_token_id,
        }
    }

    fn take_token_id(&mut self) -> String {
        let id = *self.next_token_id;
        *self.next_token_id += 1;
        format!("token-{id}")
    }
}

/// Sort key for token ids of the form `"token-{n}"`: numeric order first
/// (so `token-2` sorts before `token-10`), falling back to lexical order for
/// any id that doesn't match the pattern. Keeps per-tick iteration over
/// tokens deterministic and independent of hash-map bucket order.
fn token_sort_key(id: &str) -> (u64, &str) {
    let n = id
        .strip_prefix("token-")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(u64::MAX);
    (n, id)
}

/// A flattened `"id:status:edge_index,…"` fingerprint of every token,
/// sorted by id so the comparison is independent of map iteration order.
/// The fixed-point loop exits once two successive iterations produce the
/// same fingerprint.
fn fingerprint(store: &StateStore) -> String {
    let mut tokens: Vec<&Token> = store.get_state().tokens.get().values().collect();
    tokens.sort_by(|a, b| a.id.cmp(&b.id));
    tokens
        .iter()
        .map(|t| format!("{}:{:?}:{}", t.id, t.status, t.current_edge_index))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn advance_tokens(store: &mut StateStore, ctx: &mut AdvanceContext, now_ms: u64) {
    let mut iterations = 0;
    let mut last_fingerprint = fingerprint(store);
    loop {
        iterations += 1;

        let mut traveling_ids: Vec<String> = TokenManager::by_status(store, TokenStatus::Traveling)
            .into_iter()
            .map(|t| t.id)
            .collect();
        traveling_ids.sort_by(|a, b| token_sort_key(a).cmp(&token_sort_key(b)));
        for id in traveling_ids {
            advance_one_token(store, ctx, &id, now_ms);
        }

        process_wait_points(store, &ctx.token_flow, now_ms);
        check_all_quorums(store);

        let fp = fingerprint(store);
        if fp == last_fingerprint {
            break;
        }
        last_fingerprint = fp;
        if iterations >= MAX_FIXED_POINT_ITERATIONS {
            tracing::warn!(
                now_ms,
                iterations,
                "token fixed-point loop did not converge; returning current state"
            );
            break;
        }
    }

    cleanup_terminal_tokens(store, now_ms);
}

fn advance_one_token(store: &mut StateStore, ctx: &mut AdvanceContext, token_id: &str, now_ms: u64) {
    loop {
        let Some(token) = TokenManager::get(store, token_id).cloned() else {
            return;
        };
        if token.status != TokenStatus::Traveling {
            return;
        }
        let elapsed = now_ms.saturating_sub(token.current_segment_start_ms);
        let progress = if token.current_segment_duration_ms == 0 {
            1.0
        } else {
            (elapsed as f64 / token.current_segment_duration_ms as f64).clamp(0.0, 1.0)
        };

        if progress < 1.0 {
            TokenManager::update(store, token_id, |t| t.progress = progress);
            return;
        }

        let edge_end_time = token.current_segment_start_ms + token.current_segment_duration_ms;
        move_to_next_segment(store, ctx, token_id, edge_end_time);
        // loop again: a token may cross several short edges within one tick.
    }
}

/// Advances `token_id` past the node it just reached. Mirrors the single
/// state machine driving both fresh arrivals and multi-hop catch-up within
/// one fixed-point iteration.
fn move_to_next_segment(store: &mut StateStore, ctx: &mut AdvanceContext, token_id: &str, time: u64) {
    let Some(token) = TokenManager::get(store, token_id).cloned() else {
        return;
    };
    let next_idx = token.current_edge_index + 1;

    if next_idx >= token.path.len() - 1 {
        let final_node = token.path[next_idx].clone();
        if NodeManager::is_unavailable(store, &final_node) {
            TokenManager::update(store, token_id, |t| {
                t.current_edge_index = next_idx;
                t.status = TokenStatus::Failed;
                t.progress = 1.0;
                t.terminal_at_ms = Some(time);
            });
            return;
        }

        let fan_out_id = ctx.algorithms.fan_out.as_deref().unwrap_or("none");
        let fan_out = ctx.registry.get_fan_out_strategy(fan_out_id).ok().map(|strategy| {
            let exec_ctx =
                ExecutionContext::new(ctx.graph, ctx.scenario, time, store, &ctx.algorithms, ctx.registry);
            strategy.compute_fan_out(&final_node, &exec_ctx, &ctx.algorithms.fan_out_config)
        });

        if let Some(result) = fan_out.filter(|r| r.should_fan_out) {
            birth_children(store, ctx, token_id, &result, time);
            TokenManager::update(store, token_id, |t| {
                t.current_edge_index = next_idx;
                t.status = TokenStatus::Waiting;
                t.waiting_at_node = Some(final_node.clone());
                t.progress = 1.0;
                t.current_segment_start_ms = time;
            });
            store.update_algorithm_state(|map| {
                let mut next = map.clone();
                next.insert(
                    state::quorum_key(token_id),
                    AlgorithmValue::Quorum(result.quorum_required),
                );
                next
            });
            check_quorum_for(store, token_id);
            return;
        }

        if let Some(parent_id) = token.parent_token_id.clone() {
            TokenManager::update(store, token_id, |t| {
                t.current_edge_index = next_idx;
                t.status = TokenStatus::Completed;
                t.progress = 1.0;
                t.terminal_at_ms = Some(time);
            });
            check_quorum_for(store, &parent_id);
            return;
        }

        TokenManager::update(store, token_id, |t| {
            t.current_edge_index = next_idx;
            t.status = TokenStatus::Completed;
            t.progress = 1.0;
            t.terminal_at_ms = Some(time);
        });
        return;
    }

    let n = token.path[next_idx].clone();
    if NodeManager::is_unavailable(store, &n) {
        TokenManager::update(store, token_id, |t| {
            t.current_edge_index = next_idx;
            t.status = TokenStatus::Failed;
            t.progress = 1.0;
            t.terminal_at_ms = Some(time);
        });
        return;
    }

    if WaitPointManager::has(store, &n) {
        let position = WaitPointManager::enqueue(store, &n, token_id).unwrap_or(0);
        TokenManager::update(store, token_id, |t| {
            t.current_edge_index = next_idx;
            t.status = TokenStatus::Waiting;
            t.waiting_at_node = Some(n.clone());
            t.wait_position = Some(position);
            t.progress = 0.0;
            t.current_segment_start_ms = time;
        });
        return;
    }

    let next_next = token.path[next_idx + 1].clone();
    let duration = ctx.token_flow.edge_duration(&n, &next_next);
    TokenManager::update(store, token_id, |t| {
        t.current_edge_index = next_idx;
        t.current_segment_start_ms = time;
        t.current_segment_duration_ms = duration;
        t.progress = 0.0;
        t.status = TokenStatus::Traveling;
    });
}

fn birth_children(
    store: &mut StateStore,
    ctx: &mut AdvanceContext,
    parent_id: &str,
    fan_out: &FanOutResult,
    time: u64,
) {
    let config: &FanOutConfig = &ctx.algorithms.fan_out_config;
    let parent_type = TokenManager::get(store, parent_id)
        .map(|t| t.type_id.clone())
        .unwrap_or_default();
    let child_type = config.child_type_id.clone().unwrap_or(parent_type);

    let mut child_ids = Vec::new();
    for path in &fan_out.child_paths {
        let child_id = ctx.take_token_id();
        let next_hop_unavailable = path
            .get(1)
            .is_some_and(|n| NodeManager::is_unavailable(store, n));
        let child = if next_hop_unavailable {
            let mut t = Token::emit(child_id.clone(), child_type.clone(), path.clone(), time, 0);
            t.status = TokenStatus::Failed;
            t.current_edge_index = path.len() - 1;
            t.progress = 1.0;
            t.terminal_at_ms = Some(time);
            t
        } else {
            let duration = ctx.token_flow.edge_duration(&path[0], &path[1]);
            Token::emit(child_id.clone(), child_type.clone(), path.clone(), time, duration)
        };
        let mut child = child;
        child.parent_token_id = Some(parent_id.to_string());
        child_ids.push(child_id);
        let _ = TokenManager::add(store, child);
    }
    TokenManager::update(store, parent_id, |t| {
        t.child_token_ids = child_ids;
    });
}

/// Quorum check for a waiting parent: `Q = algorithm_state["quorum:"+id]`
/// (default = child count). `completed_count >= Q` completes the parent;
/// `children - failed_count < Q` (quorum unreachable) fails it; otherwise
/// it stays waiting.
fn check_quorum_for(store: &mut StateStore, parent_id: &str) {
    let Some(parent) = TokenManager::get(store, parent_id).cloned() else {
        return;
    };
    if parent.status != TokenStatus::Waiting || parent.child_token_ids.is_empty() {
        return;
    }
    let children: Vec<Token> = parent
        .child_token_ids
        .iter()
        .filter_map(|id| TokenManager::get(store, id).cloned())
        .collect();
    let total = children.len();
    let completed = children.iter().filter(|c| c.status == TokenStatus::Completed).count();
    let failed = children.iter().filter(|c| c.status == TokenStatus::Failed).count();
    let quorum = store
        .get_state()
        .algorithm_state
        .get()
        .get(&state::quorum_key(parent_id))
        .and_then(AlgorithmValue::as_quorum)
        .unwrap_or(total);

    if completed >= quorum {
        TokenManager::update(store, parent_id, |t| {
            t.status = TokenStatus::Completed;
            t.progress = 1.0;
        });
    } else if total.saturating_sub(failed) < quorum {
        TokenManager::update(store, parent_id, |t| {
            t.status = TokenStatus::Failed;
            t.progress = 1.0;
        });
    }
}

fn check_all_quorums(store: &mut StateStore) {
    let mut waiting_parent_ids: Vec<String> = TokenManager::by_status(store, TokenStatus::Waiting)
        .into_iter()
        .filter(|t| !t.child_token_ids.is_empty())
        .map(|t| t.id)
        .collect();
    waiting_parent_ids.sort_by(|a, b| token_sort_key(a).cmp(&token_sort_key(b)));
    for id in waiting_parent_ids {
        check_quorum_for(store, &id);
    }
}

fn process_wait_points(store: &mut StateStore, token_flow: &TokenFlowConfig, now_ms: u64) {
    let mut node_ids: Vec<String> = WaitPointManager::all(store).into_iter().map(|(id, _)| id).collect();
    node_ids.sort();
    for node_id in node_ids {
        while WaitPointManager::can_release(store, &node_id, now_ms) {
            let release_time = store
                .get_state()
                .wait_points
                .get()
                .get(&node_id)
                .map(|wp| wp.last_processed_ms + wp.config.process_interval_ms)
                .unwrap_or(now_ms);
            let Some(token_id) = WaitPointManager::dequeue(store, &node_id, release_time) else {
                break;
            };
            let Some(token) = TokenManager::get(store, &token_id).cloned() else {
                continue;
            };
            if !token.has_next_node() {
                continue;
            }
            let next_node = token.path[token.current_edge_index + 1].clone();
            let duration = token_flow.edge_duration(&node_id, &next_node);
            TokenManager::update(store, &token_id, |t| {
                t.status = TokenStatus::Traveling;
                t.waiting_at_node = None;
                t.wait_position = None;
                t.current_segment_start_ms = release_time;
                t.current_segment_duration_ms = duration;
                t.progress = 0.0;
            });
            renumber_wait_positions(store, &node_id);
        }
    }
}

fn renumber_wait_positions(store: &mut StateStore, node_id: &str) {
    let waiters = WaitPointManager::get(store, node_id)
        .map(|wp| wp.token_ids.clone())
        .unwrap_or_default();
    let positions: FxHashMap<String, usize> =
        waiters.into_iter().enumerate().map(|(i, id)| (id, i)).collect();
    for (token_id, position) in positions {
        TokenManager::update(store, &token_id, |t| {
            t.wait_position = Some(position);
        });
    }
}

fn cleanup_terminal_tokens(store: &mut StateStore, now_ms: u64) {
    let to_remove: Vec<String> = store
        .get_state()
        .tokens
        .get()
        .values()
        .filter(|t| {
            t.is_terminal()
                && t.terminal_at_ms
                    .is_some_and(|end| now_ms.saturating_sub(end) > CLEANUP_WINDOW_MS)
        })
        .map(|t| t.id.clone())
        .collect();
    for id in to_remove {
        TokenManager::remove(store, &id);
    }
}
