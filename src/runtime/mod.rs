//! The scenario runner: ties the data model, state store, managers,
//! algorithm registry, and event handlers into `seek_to`/`advance_to`.

pub mod runner;
pub mod snapshot;
pub mod token_advance;

pub use runner::{RunnerError, ScenarioRunner};
pub use snapshot::Snapshot;
