//! Process-wide registry of named routing/balancing/replication strategies.
//!
//! Every strategy is a pure function over `(ExecutionContext, inputs)`; any
//! persistent per-strategy state lives in `SimulationState.algorithm_state`,
//! never inside the strategy value itself, so strategies stay `Send + Sync`
//! and shareable behind the registry's `Arc`s.

pub mod consensus;
pub mod failover;
pub mod fan_out;
pub mod load_balancer;
pub mod path_selector;
pub mod state;

use std::cell::RefCell;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::graph::Graph;
use crate::model::{AlgorithmsConfig, Scenario};
use crate::state::StateStore;

pub use consensus::{ConsensusInputs, ConsensusPredicate};
pub use failover::FailoverStrategy;
pub use fan_out::{FanOutResult, FanOutStrategy};
pub use load_balancer::LoadBalancer;
pub use path_selector::PathSelector;

/// A load balancer's choice, recorded by [`ExecutionContext::record_load_balancer_selection`]
/// so the caller can commit the balancer's statefulness (cursor, draw count)
/// once it holds `&mut StateStore` again. `select_node` itself only sees a
/// shared `&StateStore`, so it cannot persist this directly.
#[derive(Clone, Debug)]
pub struct LoadBalancerSelection {
    pub balancer_id: String,
    pub node_id: String,
}

/// The read-only view strategies see: the live graph, the current
/// simulation time, the state store (for node/token lookups and for
/// reading/writing `algorithm_state`), the scenario's algorithm selection,
/// and the registry itself (so e.g. `healthiest` can delegate to whichever
/// `LoadBalancer` the scenario configured).
pub struct ExecutionContext<'a> {
    pub graph: &'a Graph,
    pub scenario: &'a Scenario,
    pub now_ms: u64,
    pub store: &'a StateStore,
    pub algorithms: &'a AlgorithmsConfig,
    pub registry: &'a AlgorithmRegistry,
    selections: RefCell<Vec<LoadBalancerSelection>>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        graph: &'a Graph,
        scenario: &'a Scenario,
        now_ms: u64,
        store: &'a StateStore,
        algorithms: &'a AlgorithmsConfig,
        registry: &'a AlgorithmRegistry,
    ) -> Self {
        Self {
            graph,
            scenario,
            now_ms,
            store,
            algorithms,
            registry,
            selections: RefCell::new(Vec::new()),
        }
    }

    /// Called by a [`LoadBalancer`] impl after it picks a node, so the
    /// choice's statefulness can be committed once the caller has `&mut
    /// StateStore` back.
    pub fn record_load_balancer_selection(&self, balancer_id: &str, node_id: &str) {
        self.selections.borrow_mut().push(LoadBalancerSelection {
            balancer_id: balancer_id.to_string(),
            node_id: node_id.to_string(),
        });
    }

    /// Drains every selection recorded so far. Callers apply these via
    /// [`load_balancer::apply_selection`] once they hold `&mut StateStore`.
    pub fn take_load_balancer_selections(&self) -> Vec<LoadBalancerSelection> {
        self.selections.borrow_mut().drain(..).collect()
    }

    /// The scenario's configured path selector, falling back to `static`.
    pub fn path_selector(&self) -> std::sync::Arc<dyn PathSelector> {
        let id = self.algorithms.path_selector.as_deref().unwrap_or("static");
        self.registry
            .get_path_selector(id)
            .unwrap_or_else(|_| self.registry.get_path_selector("static").expect("static is always registered"))
    }

    /// The scenario's configured load balancer, falling back to
    /// `round-robin` if unset or unknown.
    pub fn load_balancer(&self) -> std::sync::Arc<dyn LoadBalancer> {
        let id = self.algorithms.load_balancer.as_deref().unwrap_or("round-robin");
        self.registry
            .get_load_balancer(id)
            .unwrap_or_else(|_| self.registry.get_load_balancer("round-robin").expect("round-robin is always registered"))
    }
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum RegistryError {
    #[error("unknown {category} strategy id `{id}`")]
    #[diagnostic(code(infra_sim_core::algorithms::unknown_strategy))]
    UnknownStrategy { category: &'static str, id: String },
}

/// Category × id registry. Strategies are `Arc`-shared so `get_*` callers
/// can hold one past the registry's own borrow.
pub struct AlgorithmRegistry {
    path_selectors: FxHashMap<String, Arc<dyn PathSelector>>,
    load_balancers: FxHashMap<String, Arc<dyn LoadBalancer>>,
    fan_out_strategies: FxHashMap<String, Arc<dyn FanOutStrategy>>,
    failover_strategies: FxHashMap<String, Arc<dyn FailoverStrategy>>,
    consensus_predicates: FxHashMap<String, Arc<dyn ConsensusPredicate>>,
}

impl AlgorithmRegistry {
    /// A registry with every default strategy id already registered.
    pub fn with_defaults() -> Self {
        let mut reg = Self {
            path_selectors: FxHashMap::default(),
            load_balancers: FxHashMap::default(),
            fan_out_strategies: FxHashMap::default(),
            failover_strategies: FxHashMap::default(),
            consensus_predicates: FxHashMap::default(),
        };
        reg.register_path_selector("static", Arc::new(path_selector::StaticSelector));
        reg.register_path_selector("healthiest", Arc::new(path_selector::HealthiestSelector));
        reg.register_path_selector("primary-aware", Arc::new(path_selector::PrimaryAwareSelector));
        reg.register_path_selector("geo-aware", Arc::new(path_selector::GeoAwareSelector));

        reg.register_load_balancer("round-robin", Arc::new(load_balancer::RoundRobin));
        reg.register_load_balancer("least-connections", Arc::new(load_balancer::LeastConnections));
        reg.register_load_balancer("weighted", Arc::new(load_balancer::Weighted));

        reg.register_fan_out_strategy("quorum-replication", Arc::new(fan_out::QuorumReplication));
        reg.register_fan_out_strategy(
            "broadcast-replication",
            Arc::new(fan_out::BroadcastReplication),
        );
        reg.register_fan_out_strategy("none", Arc::new(fan_out::NoFanOut));

        reg.register_failover_strategy("default", Arc::new(failover::DefaultFailover));

        reg.register_consensus("majority-quorum", Arc::new(consensus::MajorityQuorum));
        reg.register_consensus("strict-quorum", Arc::new(consensus::StrictQuorum));
        reg.register_consensus(
            "eventually-consistent",
            Arc::new(consensus::EventuallyConsistent),
        );
        reg
    }

    pub fn register_path_selector(&mut self, id: &str, strategy: Arc<dyn PathSelector>) {
        self.path_selectors.insert(id.to_string(), strategy);
    }

    pub fn register_load_balancer(&mut self, id: &str, strategy: Arc<dyn LoadBalancer>) {
        self.load_balancers.insert(id.to_string(), strategy);
    }

    pub fn register_fan_out_strategy(&mut self, id: &str, strategy: Arc<dyn FanOutStrategy>) {
        self.fan_out_strategies.insert(id.to_string(), strategy);
    }

    pub fn register_failover_strategy(&mut self, id: &str, strategy: Arc<dyn FailoverStrategy>) {
        self.failover_strategies.insert(id.to_string(), strategy);
    }

    pub fn register_consensus(&mut self, id: &str, strategy: Arc<dyn ConsensusPredicate>) {
        self.consensus_predicates.insert(id.to_string(), strategy);
    }

    pub fn get_path_selector(&self, id: &str) -> Result<Arc<dyn PathSelector>, RegistryError> {
        self.path_selectors
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownStrategy {
                category: "path_selector",
                id: id.to_string(),
            })
    }

    pub fn get_load_balancer(&self, id: &str) -> Result<Arc<dyn LoadBalancer>, RegistryError> {
        self.load_balancers
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownStrategy {
                category: "load_balancer",
                id: id.to_string(),
            })
    }

    pub fn get_fan_out_strategy(&self, id: &str) -> Result<Arc<dyn FanOutStrategy>, RegistryError> {
        self.fan_out_strategies
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownStrategy {
                category: "fan_out_strategy",
                id: id.to_string(),
            })
    }

    pub fn get_failover_strategy(
        &self,
        id: &str,
    ) -> Result<Arc<dyn FailoverStrategy>, RegistryError> {
        self.failover_strategies
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownStrategy {
                category: "failover_strategy",
                id: id.to_string(),
            })
    }

    pub fn get_consensus(&self, id: &str) -> Result<Arc<dyn ConsensusPredicate>, RegistryError> {
        self.consensus_predicates
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownStrategy {
                category: "consensus",
                id: id.to_string(),
            })
    }

    pub fn list_path_selectors(&self) -> Vec<&str> {
        self.path_selectors.keys().map(String::as_str).collect()
    }

    pub fn list_load_balancers(&self) -> Vec<&str> {
        self.load_balancers.keys().map(String::as_str).collect()
    }

    pub fn list_fan_out_strategies(&self) -> Vec<&str> {
        self.fan_out_strategies.keys().map(String::as_str).collect()
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
