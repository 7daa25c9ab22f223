//! JWT utilities shared by the store and its clients.
//!
//! This module provides common JWT validation utilities including:
//! - Size limits for DoS prevention
//! - Clock skew constants for iat validation
//! - RS256 signature and expiry verification against a [`SigningKey`]
//! - The claims structure carried by tokens from the authentication service
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only RS256 is accepted
//! - Generic error messages prevent information leakage
//! - The `sub` field in claims is redacted in Debug output
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{verify_token, validate_iat, DEFAULT_CLOCK_SKEW};
//!
//! let claims = verify_token(token, &signing_key, DEFAULT_CLOCK_SKEW)?;
//! if let Some(iat) = claims.iat {
//!     validate_iat(iat, DEFAULT_CLOCK_SKEW)?;
//! }
//! ```

use crate::signing_key::SigningKey;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Tokens larger than this are rejected BEFORE any base64 decoding or
/// signature verification. RS256 tokens with a 2048-bit key are typically
/// 600-900 bytes.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes).
///
/// Applied as leeway to `exp`/`nbf` on the store side and as the upper bound
/// for `iat` in the future.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// The only signing algorithm accepted for store tokens.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::RS256;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during JWT validation.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token header names an algorithm other than RS256.
    #[error("The access token is invalid or expired")]
    UnsupportedAlgorithm,

    /// No signing key matches the token header.
    #[error("The access token is invalid or expired")]
    UnknownKey,

    /// Signature does not verify against the signing key.
    #[error("The access token is invalid or expired")]
    InvalidSignature,

    /// Token `exp` claim is in the past.
    #[error("The access token is invalid or expired")]
    Expired,

    /// Token `nbf` claim is in the future.
    #[error("The access token is invalid or expired")]
    NotYetValid,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

impl JwtValidationError {
    /// Short stable label for logs and metrics.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::TokenTooLarge => "token_too_large",
            Self::MalformedToken => "malformed",
            Self::UnsupportedAlgorithm => "unsupported_algorithm",
            Self::UnknownKey => "unknown_key",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::IatTooFarInFuture => "iat_in_future",
        }
    }
}

// =============================================================================
// Claims Types
// =============================================================================

/// Claims carried by tokens issued by the authentication service.
///
/// Only `exp` is required. The `sub` field is redacted in Debug output.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (authenticated user) - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("iss", &self.iss)
            .field("exp", &self.exp)
            .field("nbf", &self.nbf)
            .field("iat", &self.iat)
            .finish()
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Decode the JWT header without verifying the signature.
///
/// The size limit is enforced before anything is decoded. The returned header
/// is only suitable for key lookup; the token MUST still be verified.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Header is not base64url JSON
pub fn decode_token_header(token: &str) -> Result<Header, JwtValidationError> {
    check_token_size(token)?;

    decode_header(token).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header");
        JwtValidationError::MalformedToken
    })
}

/// Verify an RS256 token's signature, `exp` and `nbf` against `key`.
///
/// `leeway` is applied to both `exp` and `nbf`. Pass [`Duration::ZERO`] for a
/// strict check (used by clients deciding whether to re-authenticate).
///
/// # Errors
///
/// Returns a `JwtValidationError` describing the first failed check. All
/// variants render the same generic message.
pub fn verify_token(
    token: &str,
    key: &SigningKey,
    leeway: Duration,
) -> Result<TokenClaims, JwtValidationError> {
    check_token_size(token)?;

    let mut validation = Validation::new(TOKEN_ALGORITHM);
    validation.leeway = leeway.as_secs();
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp"]);

    let token_data = decode::<TokenClaims>(token, key.decoding_key(), &validation).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Token verification failed");
        match e.kind() {
            ErrorKind::ExpiredSignature => JwtValidationError::Expired,
            ErrorKind::ImmatureSignature => JwtValidationError::NotYetValid,
            ErrorKind::InvalidSignature => JwtValidationError::InvalidSignature,
            ErrorKind::InvalidAlgorithm => JwtValidationError::UnsupportedAlgorithm,
            _ => JwtValidationError::MalformedToken,
        }
    })?;

    Ok(token_data.claims)
}

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// Rejects tokens with `iat` more than `clock_skew` in the future.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if the iat timestamp is more than
/// `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW by configuration
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

fn check_token_size(token: &str) -> Result<(), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_possible_wrap)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_default_clock_skew_is_5_minutes() {
        assert_eq!(DEFAULT_CLOCK_SKEW, Duration::from_secs(300));
    }

    #[test]
    fn test_max_clock_skew_is_10_minutes() {
        assert_eq!(MAX_CLOCK_SKEW, Duration::from_secs(600));
    }

    // -------------------------------------------------------------------------
    // decode_token_header Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_token_header_reads_algorithm() {
        let header = r#"{"alg":"RS256","typ":"JWT"}"#;
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        let token = format!("{header_b64}.payload.signature");

        let header = decode_token_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
    }

    #[test]
    fn test_decode_token_header_malformed() {
        assert!(matches!(
            decode_token_header("not-a-jwt"),
            Err(JwtValidationError::MalformedToken)
        ));
        assert!(matches!(
            decode_token_header(""),
            Err(JwtValidationError::MalformedToken)
        ));
    }

    #[test]
    fn test_decode_token_header_invalid_json() {
        let header_b64 = URL_SAFE_NO_PAD.encode("not-json");
        let token = format!("{header_b64}.payload.signature");

        assert!(matches!(
            decode_token_header(&token),
            Err(JwtValidationError::MalformedToken)
        ));
    }

    #[test]
    fn test_decode_token_header_oversized() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert!(matches!(
            decode_token_header(&oversized),
            Err(JwtValidationError::TokenTooLarge)
        ));
    }

    #[test]
    fn test_check_token_size_at_limit() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES);
        assert!(check_token_size(&token).is_ok());
    }

    // -------------------------------------------------------------------------
    // validate_iat Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_iat_current_time() {
        let now = chrono::Utc::now().timestamp();
        assert!(validate_iat(now, DEFAULT_CLOCK_SKEW).is_ok());
    }

    #[test]
    fn test_validate_iat_past_time() {
        let past = chrono::Utc::now().timestamp() - 3600;
        assert!(validate_iat(past, DEFAULT_CLOCK_SKEW).is_ok());
    }

    #[test]
    fn test_validate_iat_far_future() {
        let far_future = chrono::Utc::now().timestamp() + 86400;
        assert!(matches!(
            validate_iat(far_future, DEFAULT_CLOCK_SKEW),
            Err(JwtValidationError::IatTooFarInFuture)
        ));
    }

    #[test]
    fn test_validate_iat_at_boundary_exact() {
        let now = 1_700_000_000_i64;

        // iat == now + skew is the last accepted value
        assert!(validate_iat_at(now + 300, DEFAULT_CLOCK_SKEW, now).is_ok());

        // iat == now + skew + 1 is the first rejected value
        assert!(matches!(
            validate_iat_at(now + 301, DEFAULT_CLOCK_SKEW, now),
            Err(JwtValidationError::IatTooFarInFuture)
        ));
    }

    // -------------------------------------------------------------------------
    // TokenClaims Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_token_claims_debug_redacts_sub() {
        let claims = TokenClaims {
            sub: Some("alice@example.com".to_string()),
            iss: Some("authentication".to_string()),
            exp: 1_234_567_890,
            nbf: None,
            iat: Some(1_234_567_800),
        };

        let debug_str = format!("{claims:?}");

        assert!(
            !debug_str.contains("alice@example.com"),
            "Debug output should not contain actual sub value"
        );
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("authentication"));
    }

    #[test]
    fn test_token_claims_minimal_payload() {
        let claims: TokenClaims = serde_json::from_str(r#"{"exp":1234567890}"#).unwrap();

        assert_eq!(claims.exp, 1_234_567_890);
        assert!(claims.sub.is_none());
        assert!(claims.iat.is_none());
    }

    #[test]
    fn test_token_claims_missing_exp_is_rejected() {
        let result: Result<TokenClaims, _> = serde_json::from_str(r#"{"sub":"alice"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_token_claims_omits_absent_fields() {
        let claims = TokenClaims {
            sub: None,
            iss: None,
            exp: 1_234_567_890,
            nbf: None,
            iat: None,
        };

        let json = serde_json::to_string(&claims).unwrap();
        assert_eq!(json, r#"{"exp":1234567890}"#);
    }
}
