//! Test server harness for E2E testing
//!
//! Provides `TestLockerServer` for spawning real Blob Store instances over a
//! temporary base directory.

use crate::crypto_fixtures::primary_signing_key;
use common::signing_key::SigningKey;
use locker_service::auth::{JwtValidator, KeyResolver, StaticKeyResolver};
use locker_service::config::{Config, ENV_AUTH_DISABLED, ENV_BASEDIR, ENV_JWTCERTPATH};
use locker_service::routes::{self, AppState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// Test harness for spawning the Blob Store in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> anyhow::Result<()> {
///     let server = TestLockerServer::spawn().await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestLockerServer {
    addr: SocketAddr,
    config: Config,
    base_dir: TempDir,
    _handle: JoinHandle<()>,
}

impl TestLockerServer {
    /// Spawn a server trusting the primary fixture certificate.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_key(Some(primary_signing_key()), HashMap::new()).await
    }

    /// Spawn a server with authentication disabled.
    pub async fn spawn_without_auth() -> Result<Self, anyhow::Error> {
        Self::spawn_with_key(None, HashMap::new()).await
    }

    /// Spawn a server with `key` (or no auth) and extra configuration
    /// variables.
    ///
    /// The base directory is always a fresh temporary directory.
    pub async fn spawn_with_key(
        key: Option<SigningKey>,
        extra_vars: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let base_dir = tempfile::tempdir()
            .map_err(|e| anyhow::anyhow!("Failed to create base directory: {}", e))?;

        let mut vars = HashMap::from([(
            ENV_BASEDIR.to_string(),
            base_dir.path().display().to_string(),
        )]);
        if key.is_some() {
            // The key is injected directly; the path only satisfies from_vars.
            vars.insert(ENV_JWTCERTPATH.to_string(), "unused.crt".to_string());
        } else {
            vars.insert(ENV_AUTH_DISABLED.to_string(), "true".to_string());
        }
        vars.extend(extra_vars);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let jwt_validator = key.map(|key| {
            let resolver: Arc<dyn KeyResolver> = Arc::new(StaticKeyResolver::new(key));
            Arc::new(JwtValidator::new(resolver, config.jwt_clock_skew))
        });

        let state = Arc::new(AppState::new(config.clone(), jwt_validator));
        let app = routes::build_routes(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            base_dir,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Directory the server stores blobs in.
    pub fn base_dir(&self) -> &Path {
        self.base_dir.path()
    }

    /// Number of blob files currently on disk.
    pub fn blob_count(&self) -> usize {
        std::fs::read_dir(self.base_dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestLockerServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server = TestLockerServer::spawn().await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");

        Ok(())
    }

    #[tokio::test]
    async fn test_server_uses_fresh_base_dir() -> Result<(), anyhow::Error> {
        let server = TestLockerServer::spawn().await?;

        assert_eq!(server.config().base_dir, server.base_dir());
        assert_eq!(server.blob_count(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_multiple_servers_different_ports() -> Result<(), anyhow::Error> {
        let server1 = TestLockerServer::spawn().await?;
        let server2 = TestLockerServer::spawn_without_auth().await?;

        assert_ne!(server1.addr(), server2.addr());
        assert_ne!(server1.base_dir(), server2.base_dir());

        Ok(())
    }
}
