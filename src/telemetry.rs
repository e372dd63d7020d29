//! Structured logging setup (SPEC_FULL.md §12).
//!
//! `tracing` is already part of the teacher's dependency table and used at
//! the density `plugin.rs` shows (info on lifecycle transitions, debug on
//! internal steps); `tracing-subscriber` is added here to actually install
//! a subscriber, since the teacher crate is a library loaded into a host
//! process that owns that responsibility instead.

use tracing_subscriber::{
    fmt,
    prelude::*,
    EnvFilter,
};

use crate::config::TelemetryConfig;

/// Initialize the global tracing subscriber. Must be called once, before
/// any other crate code runs.
pub fn init(config: &TelemetryConfig) {
    let filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
