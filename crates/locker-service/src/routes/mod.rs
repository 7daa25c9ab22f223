//! HTTP routes for the Blob Store.
//!
//! Defines the Axum routers and application state.

use crate::auth::JwtValidator;
use crate::config::Config;
use crate::errors::LockerError;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use crate::storage::BlobStore;
use axum::{
    middleware,
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Blob files under `config.base_dir`.
    pub store: BlobStore,

    /// Token validator; `None` when authentication is disabled.
    pub jwt_validator: Option<Arc<JwtValidator>>,
}

impl AppState {
    pub fn new(config: Config, jwt_validator: Option<Arc<JwtValidator>>) -> Self {
        let store = BlobStore::new(config.base_dir.clone());
        Self {
            config,
            store,
            jwt_validator,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe, public, GET only
/// - `/` and `/*path` - Blob GET/PUT/DELETE, behind `require_auth` unless
///   authentication is disabled
/// - Panic recovery, request logging, request timeout and HTTP metrics
pub fn build_routes(state: Arc<AppState>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state.clone());

    let mut blob_routes = Router::new()
        .route("/", blob_methods())
        .route("/*path", blob_methods());

    match &state.jwt_validator {
        Some(jwt_validator) => {
            let auth_state = Arc::new(AuthState {
                jwt_validator: Arc::clone(jwt_validator),
            });
            blob_routes =
                blob_routes.route_layer(middleware::from_fn_with_state(auth_state, require_auth));
        }
        None => {
            tracing::warn!(
                target: "locker.routes",
                "Authentication disabled: blob routes accept unauthenticated requests"
            );
        }
    }

    let request_timeout = state.config.request_timeout;
    let app = public_routes.merge(blob_routes.with_state(state));

    with_service_layers(app, request_timeout)
}

/// Build the router served on the metrics listener.
pub fn build_metrics_routes(metrics_handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle)
}

fn blob_methods() -> MethodRouter<Arc<AppState>> {
    get(handlers::get_blob)
        .put(handlers::put_blob)
        .delete(handlers::delete_blob)
}

/// Apply global middleware layers.
///
/// Layer order (outermost first):
/// 1. http_metrics_middleware - Record ALL responses
/// 2. TimeoutLayer - 408 after `request_timeout`
/// 3. TraceLayer - Log request details
/// 4. CatchPanicLayer - Turn handler panics into 500
fn with_service_layers(router: Router, request_timeout: Duration) -> Router {
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(http_metrics_middleware))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| err.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    tracing::error!(target: "locker.routes", panic = %detail, "Request handler panicked");
    LockerError::Internal.into_response()
}
