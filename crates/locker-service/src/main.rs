//! Coatlocker Blob Store
//!
//! Entry point: loads and validates configuration, loads the JWT signing key
//! and serves the blob routes over HTTP or HTTPS.

use anyhow::Context;
use axum::Router;
use clap::Parser;
use locker_service::auth::{load_signing_key, JwtValidator, KeyResolver, StaticKeyResolver};
use locker_service::cli::Args;
use locker_service::config::{Config, TlsPaths};
use locker_service::observability::metrics::init_metrics_recorder;
use locker_service::routes::{self, AppState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "locker_service=debug,common=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Coatlocker Blob Store");

    // Load configuration: environment first, flags override
    let mut vars: HashMap<String, String> = std::env::vars().collect();
    args.apply_to(&mut vars);

    let config = Config::from_vars(&vars).inspect_err(|e| {
        error!("Failed to load configuration: {}", e);
    })?;

    config.validate().inspect_err(|e| {
        error!("Configuration validation failed: {}", e);
    })?;

    info!(
        base_dir = %config.base_dir.display(),
        bind_address = %config.bind_address(),
        tls = config.tls.is_some(),
        request_timeout_seconds = config.request_timeout.as_secs(),
        jwt_clock_skew_seconds = config.jwt_clock_skew.as_secs(),
        "Configuration loaded successfully"
    );

    // axum-server builds its TLS config from the process-wide crypto provider
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A rustls crypto provider was already installed");
    }

    // Load the JWT signing key once; it never changes while serving
    let jwt_validator = load_signing_key(&config.jwt_key_source)
        .await
        .context("Failed to load JWT signing key")?
        .map(|key| {
            let resolver: Arc<dyn KeyResolver> = Arc::new(StaticKeyResolver::new(key));
            Arc::new(JwtValidator::new(resolver, config.jwt_clock_skew))
        });

    if let Some(metrics_address) = config.metrics_address {
        spawn_metrics_listener(metrics_address).await?;
    }

    let bind_address = config.bind_address();
    let tls = config.tls.clone();
    let drain_period = config.drain_period;

    let state = Arc::new(AppState::new(config, jwt_validator));
    let app = routes::build_routes(state);

    match tls {
        Some(tls) => serve_tls(app, bind_address, &tls, drain_period).await?,
        None => serve_plain(app, bind_address, drain_period).await?,
    }

    info!("Coatlocker Blob Store shutdown complete");

    Ok(())
}

async fn serve_plain(app: Router, addr: SocketAddr, drain_period: Duration) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Coatlocker Blob Store listening on http://{}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(drain_period))
        .await?;

    Ok(())
}

async fn serve_tls(
    app: Router,
    addr: SocketAddr,
    tls: &TlsPaths,
    drain_period: Duration,
) -> anyhow::Result<()> {
    let rustls_config =
        axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
            .await
            .context("Failed to load TLS certificate and key")?;

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_signal(drain_period).await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!("Coatlocker Blob Store listening on https://{}", addr);

    axum_server::bind_rustls(addr, rustls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .with_context(|| format!("Failed to serve on {addr}"))?;

    Ok(())
}

/// Install the Prometheus recorder and serve `/metrics` on its own listener.
async fn spawn_metrics_listener(addr: SocketAddr) -> anyhow::Result<()> {
    let handle = init_metrics_recorder().map_err(|e| anyhow::anyhow!(e))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics listener {addr}"))?;

    info!("Metrics listening on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, routes::build_metrics_routes(handle)).await {
            error!("Metrics listener failed: {}", e);
        }
    });

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and the drain period is complete.
async fn shutdown_signal(drain_period: Duration) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_period.is_zero() {
        info!("Skipping drain period (COATLOCKER_DRAIN_SECONDS=0)");
    } else {
        warn!("Draining connections for {} seconds...", drain_period.as_secs());
        tokio::time::sleep(drain_period).await;
        info!("Drain period complete");
    }
}
