//! Fixed cryptographic fixtures for testing
//!
//! Two self-signed RSA-2048 certificates with their PKCS#8 private keys:
//!
//! - **primary**: the authentication service's signing pair; servers under
//!   test trust its certificate
//! - **rogue**: an unrelated pair; tokens it signs must be rejected
//!
//! Both certificates are valid until 2126.

use common::signing_key::SigningKey;
use std::path::{Path, PathBuf};

/// Certificate whose key verifies tokens in tests.
pub const PRIMARY_CERT_PEM: &str = include_str!("../fixtures/primary.crt");

/// Private key matching [`PRIMARY_CERT_PEM`].
pub const PRIMARY_KEY_PEM: &str = include_str!("../fixtures/primary.key");

/// Certificate nobody trusts.
pub const ROGUE_CERT_PEM: &str = include_str!("../fixtures/rogue.crt");

/// Private key matching [`ROGUE_CERT_PEM`].
pub const ROGUE_KEY_PEM: &str = include_str!("../fixtures/rogue.key");

/// Subject of the primary certificate.
pub const PRIMARY_CERT_SUBJECT: &str = "CN=coatlocker-test-primary";

/// Signing key loaded from [`PRIMARY_CERT_PEM`].
///
/// # Panics
///
/// Panics if the fixture fails to load.
pub fn primary_signing_key() -> SigningKey {
    SigningKey::from_pem(PRIMARY_CERT_PEM.as_bytes()).expect("primary fixture certificate loads")
}

/// Signing key loaded from [`ROGUE_CERT_PEM`].
///
/// # Panics
///
/// Panics if the fixture fails to load.
pub fn rogue_signing_key() -> SigningKey {
    SigningKey::from_pem(ROGUE_CERT_PEM.as_bytes()).expect("rogue fixture certificate loads")
}

/// Remove every line break from a PEM document.
///
/// Produces the `-----BEGIN CERTIFICATE-----MIIC...-----END CERTIFICATE-----`
/// shape some HTTP endpoints serve.
pub fn flattened_pem(pem: &str) -> String {
    pem.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}

/// Write `contents` to `dir/name` and return the path.
///
/// # Panics
///
/// Panics if the file cannot be written.
pub fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("fixture file written");
    path
}
