use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all reaper metrics
const PREFIX: &str = "reaper";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Batch Metrics
    pub static ref BATCH_TICKS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_batch_ticks_total"),
        "Total number of batch ticks run"
    ).expect("Failed to create batch_ticks_total metric");

    pub static ref PHASE_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_phase_duration_seconds"),
            "Lifecycle phase duration in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0]),
        &["phase"]
    ).expect("Failed to create phase_duration_seconds metric");

    pub static ref PHASE_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_phase_runs_total"), "Lifecycle phase runs by result"),
        &["phase", "status"]
    ).expect("Failed to create phase_runs_total metric");

    pub static ref RESOURCES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_resources_total"), "Resources evaluated by outcome"),
        &["phase", "outcome"]
    ).expect("Failed to create resources_total metric");

    pub static ref RENEWALS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_renewals_total"), "Renewal requests by result"),
        &["status"]
    ).expect("Failed to create renewals_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(BATCH_TICKS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PHASE_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(PHASE_RUNS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RESOURCES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RENEWALS_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

pub fn record_batch_tick() {
    BATCH_TICKS_TOTAL.inc();
}

/// Record a finished phase run. `status` is one of success, query_error,
/// schedule_error, panic.
pub fn record_phase_run(phase: &str, status: &str, duration: Duration) {
    PHASE_RUNS_TOTAL.with_label_values(&[phase, status]).inc();
    PHASE_DURATION_SECONDS
        .with_label_values(&[phase])
        .observe(duration.as_secs_f64());
}

pub fn record_resource_outcome(phase: &str, outcome: &str) {
    RESOURCES_TOTAL.with_label_values(&[phase, outcome]).inc();
}

pub fn record_renewal(status: &str) {
    RENEWALS_TOTAL.with_label_values(&[status]).inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
