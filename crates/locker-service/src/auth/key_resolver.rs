//! Signing key resolution.
//!
//! The validator never reaches for a global key: it asks a [`KeyResolver`]
//! for the key matching a token header. The store ships one implementation,
//! [`StaticKeyResolver`], holding the key loaded at startup.

use crate::config::JwtKeySource;
use common::credential_client::{load_signing_key_from_url, CredentialError};
use common::jwt::JwtValidationError;
use common::signing_key::SigningKey;
use jsonwebtoken::Header;
use tracing::info;

/// Resolves the key that verifies a token.
pub trait KeyResolver: Send + Sync {
    /// Return the signing key for a token with `header`.
    ///
    /// # Errors
    ///
    /// Returns `JwtValidationError::UnknownKey` when no key matches.
    fn resolve_key(&self, header: &Header) -> Result<&SigningKey, JwtValidationError>;
}

/// Resolver that always returns the single key loaded at startup.
#[derive(Debug, Clone)]
pub struct StaticKeyResolver {
    key: SigningKey,
}

impl StaticKeyResolver {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }
}

impl KeyResolver for StaticKeyResolver {
    fn resolve_key(&self, _header: &Header) -> Result<&SigningKey, JwtValidationError> {
        Ok(&self.key)
    }
}

/// Load the signing key named by `source`.
///
/// Returns `Ok(None)` when authentication is disabled.
///
/// # Errors
///
/// Returns the `CredentialError` from reading or fetching the certificate.
pub async fn load_signing_key(
    source: &JwtKeySource,
) -> Result<Option<SigningKey>, CredentialError> {
    let key = match source {
        JwtKeySource::Disabled => return Ok(None),
        JwtKeySource::File(path) => SigningKey::from_file(path)?,
        JwtKeySource::Url { url, insecure } => load_signing_key_from_url(*insecure, url).await?,
    };

    info!(
        target: "locker.auth",
        subject = %key.subject(),
        "JWT signing key loaded"
    );

    Ok(Some(key))
}
