//! Builder patterns for test tokens
//!
//! Provides a fluent API for creating RS256 tokens signed with the fixture keys.

use crate::crypto_fixtures::{PRIMARY_KEY_PEM, ROGUE_KEY_PEM};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for creating test JWTs
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user("alice")
///     .expires_in(3600)
///     .sign();
/// ```
pub struct TestTokenBuilder {
    sub: Option<String>,
    iss: Option<String>,
    exp: i64,
    nbf: Option<i64>,
    iat: Option<i64>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults (valid for one hour)
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: Some("admin".to_string()),
            iss: Some("coatlocker-test-auth".to_string()),
            exp: (now + Duration::seconds(3600)).timestamp(),
            nbf: None,
            iat: Some(now.timestamp()),
        }
    }

    /// Set the subject
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = Some(subject.to_string());
        self
    }

    /// Set expiration in seconds from now (negative for an expired token)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Make the token expired an hour ago
    pub fn expired(self) -> Self {
        self.expires_in(-3600)
    }

    /// Set not-before in seconds from now
    pub fn not_before_in(mut self, seconds: i64) -> Self {
        self.nbf = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = Some(timestamp);
        self
    }

    /// Build the claims as a JSON value
    pub fn claims(&self) -> Value {
        let mut claims = Map::new();
        claims.insert("exp".to_string(), json!(self.exp));
        if let Some(sub) = &self.sub {
            claims.insert("sub".to_string(), json!(sub));
        }
        if let Some(iss) = &self.iss {
            claims.insert("iss".to_string(), json!(iss));
        }
        if let Some(nbf) = self.nbf {
            claims.insert("nbf".to_string(), json!(nbf));
        }
        if let Some(iat) = self.iat {
            claims.insert("iat".to_string(), json!(iat));
        }
        Value::Object(claims)
    }

    /// Sign with the primary fixture key
    ///
    /// # Panics
    ///
    /// Panics if signing fails.
    pub fn sign(&self) -> String {
        self.sign_with(PRIMARY_KEY_PEM)
    }

    /// Sign with the rogue fixture key (foreign-signed token)
    ///
    /// # Panics
    ///
    /// Panics if signing fails.
    pub fn sign_rogue(&self) -> String {
        self.sign_with(ROGUE_KEY_PEM)
    }

    /// Sign with an arbitrary RSA private key in PEM form
    ///
    /// # Panics
    ///
    /// Panics if the key is not an RSA PEM key or signing fails.
    pub fn sign_with(&self, private_key_pem: &str) -> String {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .expect("fixture private key is RSA PEM");
        encode(&Header::new(Algorithm::RS256), &self.claims(), &key).expect("token signs")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
