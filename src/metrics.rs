//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // CSRF state lifecycle
    pub static ref STATE_TOKENS_ISSUED_TOTAL: IntCounter = IntCounter::new(
        "pasture_state_tokens_issued_total",
        "Total number of CSRF state tokens issued"
    ).expect("metric can be created");
    pub static ref STATE_VALIDATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pasture_state_validations_total", "Total number of CSRF state validations"),
        &["outcome"]
    ).expect("metric can be created");

    // GitHub API
    pub static ref GITHUB_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pasture_github_requests_total", "Total number of GitHub API requests"),
        &["endpoint", "status"]
    ).expect("metric can be created");
    pub static ref GITHUB_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "pasture_github_request_duration_seconds",
            "GitHub API request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["endpoint"]
    ).expect("metric can be created");

    // Roster cache
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pasture_cache_hits_total", "Total number of cache hits"),
        &["cache_name"]
    ).expect("metric can be created");
    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pasture_cache_misses_total", "Total number of cache misses"),
        &["cache_name"]
    ).expect("metric can be created");

    // Authentication/authorization outcomes
    pub static ref LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pasture_logins_total", "Total number of completed login attempts"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref AUTHZ_DECISIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pasture_authz_decisions_total", "Total number of authorization decisions"),
        &["decision"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pasture_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(STATE_TOKENS_ISSUED_TOTAL.clone()))
        .expect("STATE_TOKENS_ISSUED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(STATE_VALIDATIONS_TOTAL.clone()))
        .expect("STATE_VALIDATIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(GITHUB_REQUESTS_TOTAL.clone()))
        .expect("GITHUB_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(GITHUB_REQUEST_DURATION_SECONDS.clone()))
        .expect("GITHUB_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(CACHE_HITS_TOTAL.clone()))
        .expect("CACHE_HITS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CACHE_MISSES_TOTAL.clone()))
        .expect("CACHE_MISSES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(LOGINS_TOTAL.clone()))
        .expect("LOGINS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(AUTHZ_DECISIONS_TOTAL.clone()))
        .expect("AUTHZ_DECISIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

/// Metrics endpoint handler
///
/// Returns all metrics in Prometheus text format.
async fn metrics_handler() -> axum::response::Response {
    use axum::response::IntoResponse;
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    match encoder.encode_to_string(&metric_families) {
        Ok(metrics_text) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, encoder.format_type())],
            metrics_text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics",
            )
                .into_response()
        }
    }
}

/// Create metrics router
///
/// Exposes the `/metrics` endpoint.
pub fn metrics_router<S>() -> axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    axum::Router::new().route("/metrics", axum::routing::get(metrics_handler))
}
