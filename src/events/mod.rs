//! Event handlers: turn a [`ScenarioEvent`](crate::model::ScenarioEvent) plus
//! an [`ExecutionContext`](crate::algorithms::ExecutionContext) into a pure
//! delta the runner applies through the managers.

pub mod handlers;

pub use handlers::{apply, handle, EventResult, NodeDelta};
