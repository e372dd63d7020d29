//! Metrics (spec.md §12 supplement): counters and histograms for bid
//! outcomes, OCC retry counts, and broadcaster lag, scraped over
//! `TelemetryConfig::metrics_bind_addr`.
//!
//! Follows the `metrics` + `metrics-exporter-prometheus` pairing used
//! elsewhere in this corpus for sequencer-facing services: `describe_*` is
//! called once at startup, and call sites record with the `counter!` /
//! `histogram!` macros directly rather than threading handles through.

use metrics_exporter_prometheus::PrometheusBuilder;

pub const BID_OUTCOME_TOTAL: &str = "auction_bid_outcome_total";
pub const OCC_RETRIES: &str = "auction_occ_retries";
pub const BROADCAST_LAGGED_TOTAL: &str = "auction_broadcast_lagged_total";
pub const EXTENSION_TOTAL: &str = "auction_extension_total";

/// Registers descriptions and installs the Prometheus recorder+exporter on
/// `bind_addr`. Call once at startup, before any `counter!`/`histogram!`
/// call site runs.
pub fn install(bind_addr: &str) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let addr: std::net::SocketAddr = bind_addr
        .parse()
        .unwrap_or_else(|_| ([0, 0, 0, 0], 9090).into());

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    describe();
    Ok(())
}

fn describe() {
    metrics::describe_counter!(
        BID_OUTCOME_TOTAL,
        "Total bid submissions by outcome (accepted, outbid, contention, validation, overloaded, cancelled)"
    );
    metrics::describe_histogram!(
        OCC_RETRIES,
        "Number of optimistic-concurrency retries a submission needed before it resolved"
    );
    metrics::describe_counter!(
        BROADCAST_LAGGED_TOTAL,
        "Subscriber receive attempts that observed a lag (dropped buffered events)"
    );
    metrics::describe_counter!(
        EXTENSION_TOTAL,
        "Anti-snipe extensions applied, labeled by whether the cap was already reached"
    );
}

/// Record a resolved bid outcome and the number of OCC attempts it took.
pub fn record_bid_outcome(outcome: &'static str, attempts: u32) {
    metrics::counter!(BID_OUTCOME_TOTAL, "outcome" => outcome).increment(1);
    metrics::histogram!(OCC_RETRIES).record(f64::from(attempts));
}

pub fn record_extension(applied: bool) {
    let label = if applied { "applied" } else { "skipped" };
    metrics::counter!(EXTENSION_TOTAL, "result" => label).increment(1);
}

pub fn record_broadcast_lag() {
    metrics::counter!(BROADCAST_LAGGED_TOTAL).increment(1);
}
