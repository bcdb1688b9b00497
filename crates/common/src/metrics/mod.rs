//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions
//! for the trust engine and its HTTP surface.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all TrustGraph metrics
pub const METRICS_PREFIX: &str = "trustgraph";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
];

/// Buckets for full recompute cycles (PageRank over the whole graph)
pub const RECOMPUTE_BUCKETS: &[f64] = &[
    0.1,
    0.5,
    1.0,
    5.0,
    15.0,
    30.0,
    60.0,
    120.0,
    300.0,
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Analytics metrics
    describe_counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total analytics queries by kind"
    );

    // Graph metrics
    describe_gauge!(
        format!("{}_graph_nodes", METRICS_PREFIX),
        Unit::Count,
        "Scored identities after the last recompute"
    );

    describe_gauge!(
        format!("{}_graph_edges", METRICS_PREFIX),
        Unit::Count,
        "Follow edges in the graph store"
    );

    describe_counter!(
        format!("{}_edges_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total follow edges appended"
    );

    // Recompute metrics
    describe_histogram!(
        format!("{}_recompute_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Crawl/recompute/publish cycle latency in seconds"
    );

    describe_counter!(
        format!("{}_recompute_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Recomputes that left the previous scores in place"
    );

    // Subscription metrics
    describe_gauge!(
        format!("{}_subscribers", METRICS_PREFIX),
        Unit::Count,
        "Registered score subscribers"
    );

    describe_counter!(
        format!("{}_subscriber_push_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Pushes that timed out or hit a closed sink"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Count one analytics query
pub fn record_query(kind: &'static str) {
    counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        "kind" => kind
    )
    .increment(1);
}

/// Count appended edges
pub fn record_ingest(edges: usize) {
    counter!(format!("{}_edges_ingested_total", METRICS_PREFIX)).increment(edges as u64);
}

/// Record a finished recompute
pub fn record_recompute(duration_secs: f64, nodes: usize, edges: usize, success: bool) {
    if success {
        histogram!(format!("{}_recompute_duration_seconds", METRICS_PREFIX)).record(duration_secs);
        gauge!(format!("{}_graph_nodes", METRICS_PREFIX)).set(nodes as f64);
        gauge!(format!("{}_graph_edges", METRICS_PREFIX)).set(edges as f64);
    } else {
        counter!(format!("{}_recompute_failures_total", METRICS_PREFIX)).increment(1);
    }
}

/// Track subscriber population and push failures
pub fn record_subscribers(active: usize, push_failures: usize) {
    gauge!(format!("{}_subscribers", METRICS_PREFIX)).set(active as f64);

    if push_failures > 0 {
        counter!(format!("{}_subscriber_push_failures_total", METRICS_PREFIX))
            .increment(push_failures as u64);
    }
}
