//! Metrics definitions for the Blob Store.
//!
//! All metrics follow Prometheus naming conventions:
//! - `locker_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods
//! - `endpoint`: `/health` or `/{key}` (blob paths are never used as labels)
//! - `operation`: get, put, delete
//! - `outcome`: bounded by storage result variants
//! - `reason`: bounded by token validation error variants

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used to render
/// the `/metrics` endpoint.
///
/// Must be called before any metrics are recorded. Without a recorder the
/// `record_*` functions are no-ops.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("locker_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 5.000, 15.000, 60.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `locker_http_requests_total`, `locker_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let endpoint = normalize_endpoint(path);
    let status = categorize_status_code(status_code);

    histogram!("locker_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("locker_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Blob paths are user-chosen; collapse them to one label value.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/metrics" => "/metrics",
        _ => "/{key}",
    }
}

// ============================================================================
// Blob Operation Metrics
// ============================================================================

/// Record a Blob Store operation outcome
///
/// Metric: `locker_blob_operations_total`
/// Labels: `operation` (get, put, delete), `outcome`
pub fn record_blob_operation(operation: &'static str, outcome: &'static str) {
    counter!("locker_blob_operations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Record a rejected request
///
/// Metric: `locker_auth_failures_total`
/// Labels: `reason`
pub fn record_auth_failure(reason: &'static str) {
    counter!("locker_auth_failures_total", "reason" => reason).increment(1);
}
