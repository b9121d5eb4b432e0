//! `ScenarioRunner`: the kernel tying the state store, managers, algorithm
//! registry, and event/token subsystems into `seek_to`/`advance_to`.

use crate::algorithms::{AlgorithmRegistry, ExecutionContext, RegistryError};
use crate::events;
use crate::graph::{Graph, GraphError};
use crate::managers::{TokenManager, WaitPointManager};
use crate::model::{EventAction, Scenario, ScenarioEvent, Token};
use crate::state::{SimulationState, StateStore};

use super::snapshot::{self, Snapshot};
use super::token_advance::{self, AdvanceContext};

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum RunnerError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UnknownAlgorithm(#[from] RegistryError),
}

pub struct ScenarioRunner {
    graph: Graph,
    scenario: Scenario,
    registry: AlgorithmRegistry,
    store: StateStore,
    next_token_id: u64,
    active_flow_id: Option<String>,
}

impl ScenarioRunner {
    /// Validates the graph and the scenario's algorithm selection, sets up
    /// wait points from `token_flow_config`, and writes the `t=0`
    /// checkpoint.
    pub fn new(scenario: Scenario, graph: Graph) -> Result<Self, RunnerError> {
        graph.validate()?;
        let registry = AlgorithmRegistry::with_defaults();
        let algorithms = scenario.algorithms();
        if let Some(id) = &algorithms.path_selector {
            registry.get_path_selector(id).map_err(RunnerError::UnknownAlgorithm)?;
        }
        if let Some(id) = &algorithms.load_balancer {
            registry.get_load_balancer(id).map_err(RunnerError::UnknownAlgorithm)?;
        }
        if let Some(id) = &algorithms.fan_out {
            registry
                .get_fan_out_strategy(id)
                .map_err(RunnerError::UnknownAlgorithm)?;
        }
        if let Some(id) = &algorithms.consensus {
            registry.get_consensus(id).map_err(RunnerError::UnknownAlgorithm)?;
        }

        let mut store = StateStore::new(SimulationState::default());
        for config in scenario.token_flow_config().wait_points {
            WaitPointManager::setup(&mut store, config);
        }
        store.checkpoint(0);

        Ok(Self {
            graph,
            scenario,
            registry,
            store,
            next_token_id: 0,
            active_flow_id: None,
        })
    }

    pub fn current_time(&self) -> u64 {
        self.store.current_time_ms()
    }

    pub fn duration(&self) -> u64 {
        self.scenario.duration_ms
    }

    pub fn node_state(&self, id: &str) -> crate::model::NodeState {
        crate::managers::NodeManager::effective(&self.store, id)
    }

    pub fn active_flow_id(&self) -> Option<&str> {
        self.active_flow_id.as_deref()
    }

    pub fn get_snapshot(&self) -> Snapshot {
        snapshot::build(&self.store, self.active_flow_id.clone())
    }

    /// Restores to the greatest checkpoint ≤ `t`, recomputes `next_token_id`
    /// so newly emitted tokens never collide with ones already present,
    /// replays every unprocessed event with `timestamp_ms ≤ t`, advances
    /// tokens to `t`, and returns the resulting snapshot.
    pub fn seek_to(&mut self, t: u64) -> Snapshot {
        self.store.restore_to(t as i64);
        self.next_token_id = recompute_next_token_id(&self.store);
        self.replay_events(t);
        self.store.set_time_ms(t);
        self.run_advance(t);
        self.get_snapshot()
    }

    /// Like [`Self::seek_to`] but starts from the current time without
    /// restoring. Equivalent to `seek_to(t)` modulo which checkpoint is used:
    /// both replay every event with `timestamp_ms ≤ t` not yet in
    /// `processed_event_ids`, so neither can skip or double-apply an event.
    pub fn advance_to(&mut self, t: u64) -> Snapshot {
        self.replay_events(t);
        self.store.set_time_ms(t);
        self.run_advance(t);
        self.get_snapshot()
    }

    /// Restores the store to its initial (empty) state, re-seeds wait
    /// points, clears the checkpoint log, and writes a fresh `t=0`
    /// checkpoint.
    pub fn reset(&mut self) {
        let mut store = StateStore::new(SimulationState::default());
        for config in self.scenario.token_flow_config().wait_points {
            WaitPointManager::setup(&mut store, config);
        }
        store.checkpoint(0);
        self.store = store;
        self.next_token_id = 0;
        self.active_flow_id = None;
    }

    fn run_advance(&mut self, t: u64) {
        let mut ctx = AdvanceContext::new(&self.graph, &self.scenario, &self.registry, &mut self.next_token_id);
        token_advance::advance_tokens(&mut self.store, &mut ctx, t);
    }

    /// Replays every not-yet-processed event with `timestamp_ms ≤ to`, in
    /// `(timestamp_ms, id)` order. `processed_event_ids` is the only guard
    /// against double-applying an event, so both `seek_to` (fresh from a
    /// restored checkpoint) and `advance_to` (continuing from the current
    /// state) replay the same set of events for the same `to` — including
    /// ones at `timestamp_ms == 0`.
    fn replay_events(&mut self, to: u64) {
        let mut pending: Vec<&ScenarioEvent> = self
            .scenario
            .events
            .iter()
            .filter(|e| {
                let before_to = e.timestamp_ms <= to;
                let unprocessed = !self
                    .store
                    .get_state()
                    .processed_event_ids
                    .get()
                    .contains(&e.id);
                before_to && unprocessed
            })
            .collect();
        pending.sort_by(|a, b| a.order_key().cmp(&b.order_key()));

        for event in pending {
            let event = event.clone();
            let algorithms = self.scenario.algorithms();
            let ctx = ExecutionContext::new(
                &self.graph,
                &self.scenario,
                event.timestamp_ms,
                &self.store,
                &algorithms,
                &self.registry,
            );
            let result = events::handle(&event, &ctx);
            let selections = ctx.take_load_balancer_selections();
            drop(ctx);

            for selection in &selections {
                crate::algorithms::load_balancer::apply_selection(&mut self.store, selection);
            }
            events::apply(&mut self.store, &result, event.timestamp_ms);
            if let Some(flow_id) = &result.active_flow_id {
                self.active_flow_id = Some(flow_id.clone());
            }

            if event.action == EventAction::RouteRequest {
                if let Some(path) = &result.computed_path {
                    if path.len() >= 2 {
                        let token_flow = self.scenario.token_flow_config();
                        let type_id = token_flow.default_token_type().to_string();
                        let duration = token_flow.edge_duration(&path[0], &path[1]);
                        let id = format!("token-{}", self.next_token_id);
                        self.next_token_id += 1;
                        let token =
                            Token::emit(id, type_id, path.clone(), event.timestamp_ms, duration);
                        let _ = TokenManager::add(&mut self.store, token);
                    }
                }
            }

            self.store.update_processed_event_ids(|ids| {
                let mut next = ids.clone();
                next.insert(event.id.clone());
                next
            });
            self.store.checkpoint(event.timestamp_ms);
        }
    }
}

/// Scans every live token id of the form `token-{n}` and returns
/// `max(n) + 1`, or 0 if none exist — so a fresh emission after a seek never
/// collides with a token that survived the restore.
fn recompute_next_token_id(store: &StateStore) -> u64 {
    store
        .get_state()
        .tokens
        .get()
        .keys()
        .filter_map(|id| id.strip_prefix("token-"))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .map(|max| max + 1)
        .unwrap_or(0)
}
