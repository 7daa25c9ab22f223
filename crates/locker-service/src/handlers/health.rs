//! Health check handler.

/// Liveness probe handler.
///
/// Returns "OK" to indicate the process is running. Checks no dependencies
/// and is never behind authentication.
pub async fn health_check() -> &'static str {
    "OK"
}
