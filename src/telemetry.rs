//! Structured logging setup for embedders that want kernel diagnostics
//! (checkpoint regressions, fixed-point exhaustion, unknown event actions)
//! surfaced through `tracing` rather than swallowed.

use tracing_subscriber::{EnvFilter, fmt};

/// Installs a global `tracing` subscriber reading filter directives from
/// `INFRA_SIM_LOG` (falling back to `info`). Safe to call more than once —
/// later calls are no-ops if a subscriber is already installed.
pub fn init() {
    let filter = EnvFilter::try_from_env("INFRA_SIM_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
