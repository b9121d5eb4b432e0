//! A deterministic, seekable simulation kernel for request flows through
//! directed infrastructure graphs: edge locations, regions, availability
//! zones, load balancers, databases.
//!
//! The kernel is a synchronous function over an immutable state value —
//! there is no I/O, no persistence, and no wall-clock animation inside it.
//! Given a [`model::Scenario`] and a [`graph::Graph`], a
//! [`runtime::ScenarioRunner`] answers "what does the system look like at
//! time `t`" for any `t`, forwards or backwards, reproducibly.

pub mod algorithms;
pub mod channels;
pub mod events;
pub mod graph;
pub mod managers;
pub mod model;
pub mod runtime;
pub mod state;
pub mod telemetry;

pub use graph::{Graph, GraphError};
pub use model::Scenario;
pub use runtime::{RunnerError, ScenarioRunner, Snapshot};
