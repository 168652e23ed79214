//! Prometheus metrics for settlement-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// HTTP request counter by route and status.
pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "settlement_http_requests_total",
        "Total number of HTTP requests",
        &["route", "status"]
    )
    .expect("Failed to register http_requests_total")
});

/// Settlement counter by partner type.
pub static SETTLEMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "settlement_settlements_total",
        "Total number of completed settlements by partner type",
        &["partner_type"]
    )
    .expect("Failed to register settlements_total")
});

/// Settled amount counter by partner type.
pub static SETTLED_AMOUNT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "settlement_settled_amount_total",
        "Total settled amount by partner type",
        &["partner_type"]
    )
    .expect("Failed to register settled_amount_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "settlement_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "settlement_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&SETTLEMENTS_TOTAL);
    Lazy::force(&SETTLED_AMOUNT_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
