//! Prometheus metrics for kb-service.

use once_cell::sync::Lazy;
use prometheus::{
    CounterVec, Encoder, HistogramVec, TextEncoder, register_counter_vec, register_histogram_vec,
};

/// Counter for HTTP requests by method, matched route and status.
pub static HTTP_REQUESTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "kb_http_requests_total",
        "Total number of HTTP requests",
        &["method", "route", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS")
});

/// Histogram for HTTP request duration by method and matched route.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "kb_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "route"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION")
});

/// Histogram for store query duration.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "kb_db_query_duration_seconds",
        "Store query duration in seconds",
        &["backend", "operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Counter for seed passes by trigger (boot, admin, maintenance, cli) and outcome.
pub static SEED_RUNS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "kb_seed_runs_total",
        "Total number of catalog reconciliation passes",
        &["trigger", "outcome"]
    )
    .expect("Failed to register SEED_RUNS")
});

/// Counter for per-entry reconciliation results.
pub static SEED_ENTRIES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "kb_seed_entries_total",
        "Catalog entries processed by outcome",
        &["entity", "outcome"]
    )
    .expect("Failed to register SEED_ENTRIES")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS);
    Lazy::force(&HTTP_REQUEST_DURATION);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&SEED_RUNS);
    Lazy::force(&SEED_ENTRIES);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

pub fn record_http_request(method: &str, route: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS
        .with_label_values(&[method, route, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method, route])
        .observe(duration_secs);
}

pub fn record_seed_run(trigger: &str, outcome: &str) {
    SEED_RUNS.with_label_values(&[trigger, outcome]).inc();
}

pub fn record_seed_entry(entity: &str, outcome: &str) {
    SEED_ENTRIES.with_label_values(&[entity, outcome]).inc();
}
