//! Authentication middleware for blob routes.
//!
//! Extracts the Bearer token from the Authorization header and validates it
//! with the [`JwtValidator`]. A rejected request never reaches the Blob Store.

use crate::auth::JwtValidator;
use crate::errors::LockerError;
use crate::observability::metrics::record_auth_failure;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// Message returned for every rejected token.
const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub jwt_validator: Arc<JwtValidator>,
}

/// Authentication middleware that validates JWT tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - 401 Unauthorized with WWW-Authenticate header if the token is missing or invalid
/// - Otherwise passes the request on unchanged
#[instrument(skip(state, req, next), name = "locker.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, LockerError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "locker.middleware.auth", "Missing Authorization header");
            record_auth_failure("missing_header");
            LockerError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::debug!(target: "locker.middleware.auth", "Invalid Authorization header format");
        record_auth_failure("malformed_header");
        LockerError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())
    })?;

    state.jwt_validator.validate(token.trim()).map_err(|e| {
        tracing::debug!(
            target: "locker.middleware.auth",
            reason = e.reason(),
            "Token rejected"
        );
        record_auth_failure(e.reason());
        LockerError::InvalidToken(e.to_string())
    })?;

    Ok(next.run(req).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::{KeyResolver, StaticKeyResolver};
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use common::jwt::JwtValidationError;
    use common::signing_key::SigningKey;
    use jsonwebtoken::Header;
    use locker_test_utils::{primary_signing_key, TestTokenBuilder};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    struct EmptyResolver;

    impl KeyResolver for EmptyResolver {
        fn resolve_key(&self, _header: &Header) -> Result<&SigningKey, JwtValidationError> {
            Err(JwtValidationError::UnknownKey)
        }
    }

    fn app(hits: Arc<AtomicUsize>) -> Router {
        app_with_resolver(hits, Arc::new(EmptyResolver))
    }

    fn app_with_resolver(hits: Arc<AtomicUsize>, resolver: Arc<dyn KeyResolver>) -> Router {
        let auth_state = Arc::new(AuthState {
            jwt_validator: Arc::new(JwtValidator::new(resolver, Duration::from_secs(300))),
        });

        Router::new()
            .route(
                "/blob",
                get(move || {
                    let hits = Arc::clone(&hits);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        "reached"
                    }
                }),
            )
            .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
    }

    #[test]
    fn test_auth_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AuthState>();
    }

    #[tokio::test]
    async fn test_missing_header_is_rejected_before_handler() {
        let hits = Arc::new(AtomicUsize::new(0));

        let response = app(Arc::clone(&hits))
            .oneshot(HttpRequest::get("/blob").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_is_rejected() {
        let hits = Arc::new(AtomicUsize::new(0));

        let response = app(Arc::clone(&hits))
            .oneshot(
                HttpRequest::get("/blob")
                    .header(header::AUTHORIZATION, "Basic YWRtaW46YWRtaW4=")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected() {
        let hits = Arc::new(AtomicUsize::new(0));

        let response = app(Arc::clone(&hits))
            .oneshot(
                HttpRequest::get("/blob")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let resolver = Arc::new(StaticKeyResolver::new(primary_signing_key()));
        let token = TestTokenBuilder::new().sign();

        let response = app_with_resolver(Arc::clone(&hits), resolver)
            .oneshot(
                HttpRequest::get("/blob")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
