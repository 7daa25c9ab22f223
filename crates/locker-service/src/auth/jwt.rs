//! JWT validation for the Blob Store.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only RS256 is accepted; the header algorithm is checked before key lookup
//! - `exp` and `nbf` are checked with the configured leeway, `iat` with the
//!   same value as clock skew tolerance
//! - All failures carry the same generic message

use crate::auth::KeyResolver;
use common::jwt::{
    decode_token_header, validate_iat, verify_token, JwtValidationError, TokenClaims,
    TOKEN_ALGORITHM,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// JWT validator backed by a [`KeyResolver`].
pub struct JwtValidator {
    key_resolver: Arc<dyn KeyResolver>,

    /// Leeway for `exp`/`nbf` and clock skew tolerance for `iat`.
    clock_skew: Duration,
}

impl JwtValidator {
    pub fn new(key_resolver: Arc<dyn KeyResolver>, clock_skew: Duration) -> Self {
        Self {
            key_resolver,
            clock_skew,
        }
    }

    /// Validate a JWT and return its claims.
    ///
    /// # Security Checks
    ///
    /// 1. Size check - reject tokens > 8KB before parsing
    /// 2. Header must name RS256
    /// 3. Resolve the signing key for the header
    /// 4. Verify signature, `exp` and `nbf`
    /// 5. Validate `iat` with clock skew tolerance
    ///
    /// # Errors
    ///
    /// Returns the `JwtValidationError` for the first failed check.
    #[instrument(skip_all)]
    pub fn validate(&self, token: &str) -> Result<TokenClaims, JwtValidationError> {
        let header = decode_token_header(token)?;

        if header.alg != TOKEN_ALGORITHM {
            tracing::debug!(
                target: "locker.auth.jwt",
                alg = ?header.alg,
                "Token rejected: unsupported algorithm"
            );
            return Err(JwtValidationError::UnsupportedAlgorithm);
        }

        let key = self.key_resolver.resolve_key(&header)?;
        let claims = verify_token(token, key, self.clock_skew)?;

        if let Some(iat) = claims.iat {
            validate_iat(iat, self.clock_skew)?;
        }

        tracing::debug!(target: "locker.auth.jwt", "Token validated successfully");
        Ok(claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::signing_key::SigningKey;
    use jsonwebtoken::Header;

    /// Resolver with no keys at all.
    struct EmptyResolver;

    impl KeyResolver for EmptyResolver {
        fn resolve_key(&self, _header: &Header) -> Result<&SigningKey, JwtValidationError> {
            Err(JwtValidationError::UnknownKey)
        }
    }

    fn validator() -> JwtValidator {
        JwtValidator::new(Arc::new(EmptyResolver), Duration::from_secs(300))
    }

    fn unsigned_token(header_json: &str) -> String {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;

        let header = URL_SAFE_NO_PAD.encode(header_json);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"exp":9999999999}"#);
        format!("{header}.{payload}.c2lnbmF0dXJl")
    }

    #[test]
    fn test_rejects_oversized_token() {
        let token = "a".repeat(common::jwt::MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(
            validator().validate(&token).unwrap_err(),
            JwtValidationError::TokenTooLarge
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(
            validator().validate("not-a-jwt").unwrap_err(),
            JwtValidationError::MalformedToken
        );
    }

    #[test]
    fn test_rejects_non_rs256_header_before_key_lookup() {
        let token = unsigned_token(r#"{"alg":"HS256","typ":"JWT"}"#);
        assert_eq!(
            validator().validate(&token).unwrap_err(),
            JwtValidationError::UnsupportedAlgorithm
        );
    }

    #[test]
    fn test_resolver_failure_is_propagated() {
        let token = unsigned_token(r#"{"alg":"RS256","typ":"JWT"}"#);
        assert_eq!(
            validator().validate(&token).unwrap_err(),
            JwtValidationError::UnknownKey
        );
    }
}
