//! Metrics for the collection pipeline
//!
//! All names carry the `ideaforge_` prefix. Recording is a no-op until a
//! recorder (e.g. the Prometheus exporter) is installed.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all IdeaForge metrics
pub const METRICS_PREFIX: &str = "ideaforge";

/// Buckets for search-service latency (in seconds)
pub const SOURCE_BUCKETS: &[f64] = &[
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_source_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Paper source requests by query kind and outcome"
    );

    describe_histogram!(
        format!("{}_source_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Paper source request latency in seconds"
    );

    describe_counter!(
        format!("{}_oracle_calls_total", METRICS_PREFIX),
        Unit::Count,
        "Language-model oracle calls by role and outcome"
    );

    describe_histogram!(
        format!("{}_oracle_cost_usd", METRICS_PREFIX),
        "Estimated cost of a single oracle call in USD"
    );

    describe_counter!(
        format!("{}_collection_rounds_total", METRICS_PREFIX),
        Unit::Count,
        "Collection rounds by mode and outcome"
    );

    describe_gauge!(
        format!("{}_paper_bank_size", METRICS_PREFIX),
        Unit::Count,
        "Number of papers in the current paper bank"
    );

    tracing::info!("Metrics registered");
}

/// Record a paper source request
pub fn record_source_request(kind: &str, outcome: &str, duration_secs: f64) {
    counter!(
        format!("{}_source_requests_total", METRICS_PREFIX),
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_source_duration_seconds", METRICS_PREFIX),
        "kind" => kind.to_string()
    )
    .record(duration_secs);
}

/// Record an oracle call; cost is only recorded for successful calls
pub fn record_oracle_call(role: &str, success: bool, cost_usd: f64) {
    let outcome = if success { "success" } else { "error" };

    counter!(
        format!("{}_oracle_calls_total", METRICS_PREFIX),
        "role" => role.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_oracle_cost_usd", METRICS_PREFIX),
            "role" => role.to_string()
        )
        .record(cost_usd);
    }
}

/// Record the result of one collection round
pub fn record_round(mode: &str, outcome: &str, bank_size: usize) {
    counter!(
        format!("{}_collection_rounds_total", METRICS_PREFIX),
        "mode" => mode.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    gauge!(format!("{}_paper_bank_size", METRICS_PREFIX)).set(bank_size as f64);
}
