//! # Locker Client
//!
//! Client side of the Coatlocker Blob Store: a [`BlobClient`] speaking the
//! store's HTTP interface and the shared pieces of the `locker-put`,
//! `locker-get`, `locker-delete` and `locker-token` tools.
//!
//! ```rust,ignore
//! use locker_client::{BlobClient, TokenSource};
//!
//! let tokens = TokenSource::verified(credential_client);
//! let client = BlobClient::new("https://coatlocker.example", tokens, false)?;
//! client.put_file("reports/2024.csv", &path).await?;
//! ```

pub mod args;
pub mod blob_client;
pub mod errors;
pub mod exit_code;

pub use args::AuthArgs;
pub use blob_client::{BlobClient, BlobDownload, TokenSource};
pub use errors::ClientError;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the tracing subscriber for a CLI tool.
///
/// Logs go to stderr so downloaded blobs and printed tokens own stdout.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "locker_client=info,common=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
