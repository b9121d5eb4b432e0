//! Load balancers: pick one node among several candidates.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::managers::NodeManager;

use super::state::{self, AlgorithmValue, RngState};
use super::{ExecutionContext, LoadBalancerSelection};

/// Commits the statefulness of a selection [`ExecutionContext`] recorded
/// during `select_node`, once the caller holds `&mut StateStore` again.
pub fn apply_selection(store: &mut crate::state::StateStore, selection: &LoadBalancerSelection) {
    match selection.balancer_id.as_str() {
        "round-robin" => RoundRobin::record_selection(store),
        "least-connections" => LeastConnections::record_selection(store, &selection.node_id),
        "weighted" => Weighted::record_draw(store),
        _ => {}
    }
}

pub trait LoadBalancer: Send + Sync {
    /// `candidates` is assumed non-empty; callers (path selectors, fan-out)
    /// only invoke a balancer when there is something to choose among.
    fn select_node(&self, candidates: &[String], ctx: &ExecutionContext) -> String;
}

fn healthy<'a>(candidates: &'a [String], ctx: &ExecutionContext) -> Vec<&'a str> {
    candidates
        .iter()
        .filter(|n| NodeManager::is_available(ctx.store, n))
        .map(String::as_str)
        .collect()
}

/// Filters to available candidates and selects `healthy[index mod len]`,
/// incrementing a per-algorithm cursor in `algorithm_state`. Falls back to
/// `candidates[0]` if none are healthy.
pub struct RoundRobin;

impl LoadBalancer for RoundRobin {
    fn select_node(&self, candidates: &[String], ctx: &ExecutionContext) -> String {
        let healthy = healthy(candidates, ctx);
        if healthy.is_empty() {
            return candidates[0].clone();
        }
        let key = state::round_robin_key("load_balancer", "round-robin");
        let cursor = ctx
            .store
            .get_state()
            .algorithm_state
            .get()
            .get(&key)
            .and_then(AlgorithmValue::as_counter)
            .unwrap_or(0);
        let chosen = healthy[(cursor as usize) % healthy.len()].to_string();
        ctx.record_load_balancer_selection("round-robin", &chosen);
        chosen
    }
}

impl RoundRobin {
    /// Advances the round-robin cursor after a selection has been
    /// committed; called by the runner, which alone holds `&mut StateStore`.
    pub fn record_selection(store: &mut crate::state::StateStore) {
        let key = state::round_robin_key("load_balancer", "round-robin");
        store.update_algorithm_state(|map| {
            let mut next = map.clone();
            let cursor = next.get(&key).and_then(AlgorithmValue::as_counter).unwrap_or(0);
            next.insert(key.clone(), AlgorithmValue::Counter(cursor + 1));
            next
        });
    }
}

/// Tracks a selection count per node and picks the minimum among healthy
/// candidates, incrementing that node's count.
pub struct LeastConnections;

impl LoadBalancer for LeastConnections {
    fn select_node(&self, candidates: &[String], ctx: &ExecutionContext) -> String {
        let healthy = healthy(candidates, ctx);
        if healthy.is_empty() {
            return candidates[0].clone();
        }
        let counts = ctx.store.get_state().algorithm_state.get();
        let chosen = healthy
            .into_iter()
            .min_by_key(|n| {
                let key = state::least_connections_key("load_balancer", "least-connections", n);
                counts.get(&key).and_then(AlgorithmValue::as_counter).unwrap_or(0)
            })
            .expect("non-empty")
            .to_string();
        ctx.record_load_balancer_selection("least-connections", &chosen);
        chosen
    }
}

impl LeastConnections {
    pub fn record_selection(store: &mut crate::state::StateStore, node_id: &str) {
        let key = state::least_connections_key("load_balancer", "least-connections", node_id);
        store.update_algorithm_state(|map| {
            let mut next = map.clone();
            let count = next.get(&key).and_then(AlgorithmValue::as_counter).unwrap_or(0);
            next.insert(key.clone(), AlgorithmValue::Counter(count + 1));
            next
        });
    }
}

/// Pseudo-random weighted selection among healthy candidates (default
/// weight 1). The PRNG's `(seed, draws)` pair lives in `algorithm_state`
/// rather than a process-global RNG, so replaying from any checkpoint and
/// re-drawing reproduces the exact same sequence of choices.
pub struct Weighted;

impl LoadBalancer for Weighted {
    fn select_node(&self, candidates: &[String], ctx: &ExecutionContext) -> String {
        let healthy = healthy(candidates, ctx);
        if healthy.is_empty() {
            return candidates[0].clone();
        }
        let key = state::weighted_rng_key("load_balancer", "weighted");
        let rng_state = ctx
            .store
            .get_state()
            .algorithm_state
            .get()
            .get(&key)
            .and_then(AlgorithmValue::as_rng)
            .unwrap_or(RngState { seed: 0x5ee_d42, draws: 0 });

        let mut rng = ChaCha8Rng::seed_from_u64(rng_state.seed);
        for _ in 0..rng_state.draws {
            rng.next_u64();
        }

        let weights = &ctx.algorithms.load_balancer_config.weights;
        let total: u64 = healthy
            .iter()
            .map(|n| weights.get(*n).copied().unwrap_or(1) as u64)
            .sum();
        let draw = if total == 0 { 0 } else { rng.next_u64() % total };
        let mut acc = 0u64;
        let mut chosen = healthy[0];
        for n in &healthy {
            acc += weights.get(*n).copied().unwrap_or(1) as u64;
            if draw < acc {
                chosen = n;
                break;
            }
        }
        ctx.record_load_balancer_selection("weighted", chosen);
        chosen.to_string()
    }
}

impl Weighted {
    pub fn record_draw(store: &mut crate::state::StateStore) {
        let key = state::weighted_rng_key("load_balancer", "weighted");
        store.update_algorithm_state(|map| {
            let mut next = map.clone();
            let rng_state = next
                .get(&key)
                .and_then(AlgorithmValue::as_rng)
                .unwrap_or(RngState { seed: 0x5ee_d42, draws: 0 });
            next.insert(
                key.clone(),
                AlgorithmValue::Rng(RngState {
                    seed: rng_state.seed,
                    draws: rng_state.draws + 1,
                }),
            );
            next
        });
    }
}
