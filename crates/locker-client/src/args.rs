//! Command-line flags shared by every CLI tool.

use crate::blob_client::{BlobClient, TokenSource};
use crate::errors::ClientError;
use common::credential_client::{CredentialClient, CredentialClientConfig};
use common::secret::SecretString;
use std::path::PathBuf;

/// Default authentication service URL.
pub const DEFAULT_AUTH_URL: &str = "https://authentication.sgtec.io";

/// Default Blob Store URL.
pub const DEFAULT_SERVICE_URL: &str = "https://coatlocker.sgtec.io";

/// Authentication and endpoint flags.
#[derive(clap::Args, Clone)]
pub struct AuthArgs {
    /// Do not validate TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Username presented to the authentication service
    #[arg(long, default_value = "admin")]
    pub user: String,

    /// Password presented to the authentication service
    #[arg(long, env = "COATLOCKER_PASS", default_value = "admin", hide_env_values = true)]
    pub pass: String,

    /// URL of the authentication service
    #[arg(long, default_value = DEFAULT_AUTH_URL)]
    pub authurl: String,

    /// URL of the Blob Store
    #[arg(long, default_value = DEFAULT_SERVICE_URL)]
    pub svcurl: String,

    /// Certificate used to verify tokens before they are used
    #[arg(long)]
    pub jwtcertpath: Option<PathBuf>,
}

impl std::fmt::Debug for AuthArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthArgs")
            .field("insecure", &self.insecure)
            .field("user", &self.user)
            .field("pass", &"[REDACTED]")
            .field("authurl", &self.authurl)
            .field("svcurl", &self.svcurl)
            .field("jwtcertpath", &self.jwtcertpath)
            .finish()
    }
}

impl AuthArgs {
    /// Build a [`CredentialClient`] from `cert_path`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the certificate cannot be read and
    /// `ClientError::Credential` if the client rejects its configuration.
    pub fn credential_client(&self, cert_path: &std::path::Path) -> Result<CredentialClient, ClientError> {
        let certificate_bytes = std::fs::read(cert_path)?;
        let config = CredentialClientConfig::new(
            self.authurl.clone(),
            self.user.clone(),
            SecretString::from(self.pass.clone()),
            certificate_bytes,
        )
        .with_insecure(self.insecure);

        Ok(CredentialClient::new(config)?)
    }

    /// Token source for these flags.
    ///
    /// With `--jwtcertpath` tokens are verified locally before use and a
    /// rejected token is refreshed once; without it the token is used as
    /// returned.
    ///
    /// # Errors
    ///
    /// See [`AuthArgs::credential_client`].
    pub fn token_source(&self) -> Result<TokenSource, ClientError> {
        match &self.jwtcertpath {
            Some(cert_path) => Ok(TokenSource::verified(self.credential_client(cert_path)?)),
            None => Ok(TokenSource::plain(
                self.authurl.clone(),
                self.user.clone(),
                SecretString::from(self.pass.clone()),
                self.insecure,
            )),
        }
    }

    /// Blob client for `--svcurl` using [`AuthArgs::token_source`].
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` for a bad `--svcurl`, or the error from
    /// building the token source or HTTP client.
    pub fn blob_client(&self) -> Result<BlobClient, ClientError> {
        BlobClient::new(&self.svcurl, self.token_source()?, self.insecure)
    }
}
