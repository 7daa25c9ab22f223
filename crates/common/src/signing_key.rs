//! JWT signing key loading from PEM-encoded X.509 certificates.
//!
//! The authentication service distributes the certificate whose public key
//! verifies its RS256 tokens. The certificate may arrive from a URL, a file on
//! disk or an in-memory buffer; all three end up in [`SigningKey::from_pem`].
//!
//! Certificates served over HTTP sometimes arrive with the PEM markers glued
//! to the base64 body (no newlines). [`normalize_pem`] rewrites such input into
//! canonical PEM before decoding.

use jsonwebtoken::DecodingKey;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use x509_parser::prelude::{FromDer, X509Certificate};
use x509_parser::public_key::PublicKey;

/// PEM opening marker for X.509 certificates.
pub const PEM_CERTIFICATE_BEGIN: &str = "-----BEGIN CERTIFICATE-----";

/// PEM closing marker for X.509 certificates.
pub const PEM_CERTIFICATE_END: &str = "-----END CERTIFICATE-----";

/// Base64 line width used when re-wrapping certificate bodies.
const PEM_LINE_WIDTH: usize = 64;

/// Errors raised while loading a signing certificate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CertificateError {
    /// The certificate source could not be read.
    #[error("Unable to read certificate: {0}")]
    Io(String),

    /// No PEM block could be decoded.
    #[error("Unable to decode PEM encoded certificate")]
    InvalidPem,

    /// The PEM block does not contain a DER encoded X.509 certificate.
    #[error("Failed to parse DER encoded certificate: {0}")]
    InvalidCertificate(String),

    /// The certificate key cannot verify RS256 signatures.
    #[error("Certificate public key is not an RSA key")]
    UnsupportedKey,
}

/// Public key used to verify RS256 token signatures.
///
/// Immutable once loaded. Never used for signing.
#[derive(Clone)]
pub struct SigningKey {
    decoding_key: DecodingKey,
    subject: String,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Load the signing key from PEM certificate bytes.
    ///
    /// The input is normalized first, so certificates whose markers are not
    /// separated from the body by newlines are accepted. Only the first PEM
    /// block is decoded.
    ///
    /// # Errors
    ///
    /// - `InvalidPem` - no PEM block decodes
    /// - `InvalidCertificate` - the block is not an X.509 certificate
    /// - `UnsupportedKey` - the certificate does not carry an RSA key
    pub fn from_pem(pem_bytes: &[u8]) -> Result<Self, CertificateError> {
        let text = String::from_utf8_lossy(pem_bytes);
        let normalized = normalize_pem(&text);

        let block = pem::parse(normalized.as_bytes()).map_err(|e| {
            tracing::debug!(target: "common.signing_key", error = %e, "PEM decode failed");
            CertificateError::InvalidPem
        })?;

        let (_, certificate) = X509Certificate::from_der(block.contents()).map_err(|e| {
            tracing::debug!(target: "common.signing_key", error = %e, "X.509 parse failed");
            CertificateError::InvalidCertificate(e.to_string())
        })?;

        let spki = certificate.public_key();
        match spki.parsed() {
            Ok(PublicKey::RSA(_)) => {}
            _ => {
                tracing::warn!(
                    target: "common.signing_key",
                    subject = %certificate.subject(),
                    "Signing certificate does not carry an RSA key"
                );
                return Err(CertificateError::UnsupportedKey);
            }
        }

        // The subjectPublicKey BIT STRING of an RSA SPKI is the PKCS#1
        // RSAPublicKey DER that jsonwebtoken expects.
        let decoding_key = DecodingKey::from_rsa_der(&spki.subject_public_key.data);
        let subject = certificate.subject().to_string();

        tracing::debug!(target: "common.signing_key", subject = %subject, "Signing key loaded");

        Ok(Self {
            decoding_key,
            subject,
        })
    }

    /// Load the signing key from a PEM certificate file.
    ///
    /// # Errors
    ///
    /// Returns `CertificateError::Io` if the file cannot be read, otherwise the
    /// errors of [`SigningKey::from_pem`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CertificateError> {
        let path = path.as_ref();
        let pem_bytes = std::fs::read(path).map_err(|e| {
            CertificateError::Io(format!("{}: {e}", path.display()))
        })?;
        Self::from_pem(&pem_bytes)
    }

    /// Key handed to `jsonwebtoken` for signature verification.
    #[must_use]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Distinguished name of the certificate the key came from.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Rewrite certificate PEM text into canonical form.
///
/// Every `BEGIN CERTIFICATE` ... `END CERTIFICATE` section is emitted with the
/// markers on their own lines and the body re-wrapped at 64 columns, whatever
/// whitespace the source had. Text with no complete certificate section is
/// returned unchanged.
#[must_use]
pub fn normalize_pem(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len() + 16);
    let mut rest = text;

    while let Some(begin) = rest.find(PEM_CERTIFICATE_BEGIN) {
        let body_start = begin + PEM_CERTIFICATE_BEGIN.len();
        let Some(body_len) = rest
            .get(body_start..)
            .and_then(|tail| tail.find(PEM_CERTIFICATE_END))
        else {
            break;
        };
        let body_end = body_start + body_len;

        let body: Vec<char> = rest
            .get(body_start..body_end)
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        normalized.push_str(PEM_CERTIFICATE_BEGIN);
        normalized.push('\n');
        for line in body.chunks(PEM_LINE_WIDTH) {
            normalized.extend(line.iter());
            normalized.push('\n');
        }
        normalized.push_str(PEM_CERTIFICATE_END);
        normalized.push('\n');

        rest = rest
            .get(body_end + PEM_CERTIFICATE_END.len()..)
            .unwrap_or_default();
    }

    if normalized.is_empty() {
        return text.to_string();
    }
    normalized
}
