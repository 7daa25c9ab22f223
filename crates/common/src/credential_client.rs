//! Credential client for the external authentication service.
//!
//! Obtains RS256 bearer tokens with HTTP Basic credentials and verifies them
//! locally against the service's signing certificate, so protected requests
//! never need a round trip to the authentication service.
//!
//! # Features
//!
//! - One-shot helpers: [`authenticate`], [`retrieve_certificate`],
//!   [`load_signing_key_from_url`]
//! - Stateful [`CredentialClient`] caching one verified token and
//!   re-authenticating only when the cached token no longer verifies
//! - Check-then-refresh is serialized by a mutex; concurrent callers sharing
//!   one client trigger at most one re-authentication
//!
//! # Example
//!
//! ```rust,ignore
//! use common::credential_client::{CredentialClient, CredentialClientConfig};
//! use common::secret::{ExposeSecret, SecretString};
//!
//! let config = CredentialClientConfig::new(
//!     "https://authentication.example.com".to_string(),
//!     "admin".to_string(),
//!     SecretString::from("admin"),
//!     std::fs::read("jwt.crt")?,
//! );
//! let client = CredentialClient::new(config)?;
//!
//! let token = client.retrieve_token().await?;
//! let header = format!("Bearer {}", token.expose_secret());
//! ```
//!
//! # Security
//!
//! - Password and tokens are held as `SecretString` (never logged)
//! - `insecure` disables TLS certificate validation; development only
//! - HTTP timeouts prevent hanging connections

use crate::jwt::{verify_token, JwtValidationError};
use crate::secret::{ExposeSecret, SecretString};
use crate::signing_key::{normalize_pem, CertificateError, SigningKey};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

// =============================================================================
// Constants
// =============================================================================

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout for HTTP client.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Leeway applied when deciding whether a cached token is still usable.
///
/// Zero: a client re-authenticates as soon as `exp` passes rather than
/// presenting a token the store might reject.
pub const CLIENT_VALIDATION_LEEWAY: Duration = Duration::ZERO;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while obtaining or verifying credentials.
#[derive(Error, Debug, Clone)]
pub enum CredentialError {
    /// Network-level failure (DNS, connection refused, TLS handshake).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered 401.
    #[error("Unauthorized")]
    Unauthorized,

    /// The endpoint answered 500.
    #[error("Authentication service error")]
    ServerError,

    /// The endpoint answered with any other status.
    #[error("Unexpected status code received: {0}")]
    UnexpectedStatus(u16),

    /// Client configuration is incomplete or unusable.
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// A token returned by the service failed verification.
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtValidationError),

    /// The signing certificate could not be loaded.
    #[error(transparent)]
    Certificate(#[from] CertificateError),

    /// Re-authentication was attempted and failed.
    #[error("Authentication failed: {source}")]
    AuthenticationFailed {
        #[source]
        source: Box<CredentialError>,
    },
}

// =============================================================================
// One-shot operations
// =============================================================================

/// Build the HTTP client used to talk to the authentication service.
///
/// When `insecure` is set, TLS certificate validation is disabled.
///
/// # Errors
///
/// Returns `CredentialError::InvalidConfig` if the client cannot be built.
pub fn build_http_client(insecure: bool) -> Result<reqwest::Client, CredentialError> {
    if insecure {
        warn!(
            target: "common.credential_client",
            "TLS certificate validation disabled for authentication requests"
        );
    }

    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .danger_accept_invalid_certs(insecure)
        .build()
        .map_err(|e| CredentialError::InvalidConfig(format!("Failed to build HTTP client: {e}")))
}

/// Authenticate against `url` with HTTP Basic credentials.
///
/// Performs exactly one GET. On 200 the response body is the token.
///
/// # Errors
///
/// - `Unauthorized` on 401, `ServerError` on 500, `UnexpectedStatus` otherwise
/// - `Transport` on network failure
#[instrument(skip_all)]
pub async fn authenticate(
    insecure: bool,
    url: &str,
    username: &str,
    password: &SecretString,
) -> Result<SecretString, CredentialError> {
    let http_client = build_http_client(insecure)?;
    request_token(&http_client, url, username, password).await
}

/// Retrieve the PEM signing certificate published at `url`.
///
/// The body is normalized with [`normalize_pem`] so markers glued to the
/// base64 body still decode.
///
/// # Errors
///
/// Same status and transport semantics as [`authenticate`].
#[instrument(skip_all)]
pub async fn retrieve_certificate(insecure: bool, url: &str) -> Result<String, CredentialError> {
    let http_client = build_http_client(insecure)?;

    debug!(
        target: "common.credential_client",
        url = %url,
        "Requesting signing certificate"
    );

    let response = http_client.get(url).send().await.map_err(|e| {
        debug!(target: "common.credential_client", error = %e, "HTTP request failed");
        CredentialError::Transport(e.to_string())
    })?;

    let body = read_success_body(response).await?;
    Ok(normalize_pem(&body))
}

/// Retrieve the certificate at `url` and load its signing key.
///
/// # Errors
///
/// Errors of [`retrieve_certificate`], or `Certificate` if the body does not
/// hold a usable certificate.
pub async fn load_signing_key_from_url(
    insecure: bool,
    url: &str,
) -> Result<SigningKey, CredentialError> {
    let certificate = retrieve_certificate(insecure, url).await?;
    let key = SigningKey::from_pem(certificate.as_bytes())?;

    info!(
        target: "common.credential_client",
        url = %url,
        subject = %key.subject(),
        "Signing key retrieved"
    );

    Ok(key)
}

/// Issue the Basic-auth GET and return the trimmed body as the token.
async fn request_token(
    http_client: &reqwest::Client,
    url: &str,
    username: &str,
    password: &SecretString,
) -> Result<SecretString, CredentialError> {
    debug!(
        target: "common.credential_client",
        url = %url,
        username = %username,
        "Requesting token from authentication service"
    );

    let response = http_client
        .get(url)
        .basic_auth(username, Some(password.expose_secret()))
        .send()
        .await
        .map_err(|e| {
            debug!(target: "common.credential_client", error = %e, "HTTP request failed");
            CredentialError::Transport(e.to_string())
        })?;

    let body = read_success_body(response).await?;
    Ok(SecretString::from(body.trim().to_string()))
}

/// Map the response status and read the body of a 200.
async fn read_success_body(response: reqwest::Response) -> Result<String, CredentialError> {
    let status = response.status();

    match status {
        StatusCode::OK => response.text().await.map_err(|e| {
            warn!(target: "common.credential_client", error = %e, "Failed to read response body");
            CredentialError::Transport(e.to_string())
        }),
        StatusCode::UNAUTHORIZED => {
            warn!(
                target: "common.credential_client",
                status = %status,
                "Credentials rejected by authentication service"
            );
            Err(CredentialError::Unauthorized)
        }
        StatusCode::INTERNAL_SERVER_ERROR => {
            warn!(
                target: "common.credential_client",
                status = %status,
                "Authentication service returned server error"
            );
            Err(CredentialError::ServerError)
        }
        _ => {
            warn!(
                target: "common.credential_client",
                status = %status,
                "Unexpected response from authentication service"
            );
            Err(CredentialError::UnexpectedStatus(status.as_u16()))
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a [`CredentialClient`].
#[derive(Clone)]
pub struct CredentialClientConfig {
    /// Authentication endpoint URL.
    pub url: String,

    /// Basic-auth username.
    pub username: String,

    /// Basic-auth password.
    pub password: SecretString,

    /// Skip TLS certificate validation.
    pub insecure: bool,

    /// PEM certificate whose key verifies issued tokens.
    pub certificate_bytes: Vec<u8>,
}

impl std::fmt::Debug for CredentialClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialClientConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("insecure", &self.insecure)
            .field("certificate_bytes", &self.certificate_bytes.len())
            .finish()
    }
}

impl CredentialClientConfig {
    /// Create a configuration with TLS validation enabled.
    #[must_use]
    pub fn new(
        url: String,
        username: String,
        password: SecretString,
        certificate_bytes: Vec<u8>,
    ) -> Self {
        Self {
            url,
            username,
            password,
            insecure: false,
            certificate_bytes,
        }
    }

    /// Enable or disable TLS certificate validation.
    #[must_use]
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }
}

// =============================================================================
// Credential Client
// =============================================================================

/// Stateful client caching one verified token.
pub struct CredentialClient {
    url: String,
    username: String,
    password: SecretString,
    http_client: reqwest::Client,
    signing_key: SigningKey,
    cached_token: Mutex<Option<SecretString>>,
}

impl std::fmt::Debug for CredentialClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialClient")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("signing_key", &self.signing_key)
            .finish_non_exhaustive()
    }
}

impl CredentialClient {
    /// Create a client from its configuration.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if username, password, url or certificate bytes are empty
    /// - `Certificate` if the certificate does not load
    pub fn new(config: CredentialClientConfig) -> Result<Self, CredentialError> {
        if config.username.is_empty() {
            return Err(CredentialError::InvalidConfig("username is empty".into()));
        }
        if config.password.expose_secret().is_empty() {
            return Err(CredentialError::InvalidConfig("password is empty".into()));
        }
        if config.url.is_empty() {
            return Err(CredentialError::InvalidConfig("url is empty".into()));
        }
        if config.certificate_bytes.is_empty() {
            return Err(CredentialError::InvalidConfig(
                "certificate bytes are empty".into(),
            ));
        }

        let signing_key = SigningKey::from_pem(&config.certificate_bytes)?;
        let http_client = build_http_client(config.insecure)?;

        Ok(Self {
            url: config.url,
            username: config.username,
            password: config.password,
            http_client,
            signing_key,
            cached_token: Mutex::new(None),
        })
    }

    /// Key used to verify tokens from the authentication service.
    #[must_use]
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Whether a cached token exists and still verifies.
    pub async fn still_valid(&self) -> bool {
        let cached = self.cached_token.lock().await;
        cached.as_ref().is_some_and(|token| self.verifies(token))
    }

    /// Return a valid token, re-authenticating once if the cached one is
    /// missing or no longer verifies.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` wrapping the cause if re-authentication
    /// or verification of the new token fails. The cache is left untouched.
    #[instrument(skip_all)]
    pub async fn retrieve_token(&self) -> Result<SecretString, CredentialError> {
        let mut cached = self.cached_token.lock().await;

        if let Some(token) = cached.as_ref().filter(|token| self.verifies(token)) {
            debug!(target: "common.credential_client", "Using cached token");
            return Ok(token.clone());
        }

        let token = self.reauthenticate().await.map_err(|e| {
            warn!(
                target: "common.credential_client",
                username = %self.username,
                error = %e,
                "Re-authentication failed"
            );
            CredentialError::AuthenticationFailed {
                source: Box::new(e),
            }
        })?;

        *cached = Some(token.clone());

        info!(
            target: "common.credential_client",
            username = %self.username,
            "Token acquired"
        );

        Ok(token)
    }

    /// Drop the cached token so the next `retrieve_token` re-authenticates.
    pub async fn invalidate(&self) {
        *self.cached_token.lock().await = None;
    }

    async fn reauthenticate(&self) -> Result<SecretString, CredentialError> {
        let token = request_token(&self.http_client, &self.url, &self.username, &self.password)
            .await?;
        verify_token(
            token.expose_secret(),
            &self.signing_key,
            CLIENT_VALIDATION_LEEWAY,
        )?;
        Ok(token)
    }

    fn verifies(&self, token: &SecretString) -> bool {
        verify_token(
            token.expose_secret(),
            &self.signing_key,
            CLIENT_VALIDATION_LEEWAY,
        )
        .is_ok()
    }
}

// =============================================================================
// Tests
// =============================================================================
