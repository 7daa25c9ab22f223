//! Download a blob from the Coatlocker Blob Store.

use clap::Parser;
use locker_client::{exit_code, AuthArgs, ClientError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "locker-get", version, about = "Download a blob from the Coatlocker Blob Store")]
struct Args {
    #[command(flatten)]
    auth: AuthArgs,

    /// Key of the blob to download
    #[arg(long)]
    key: Option<String>,

    /// Write the blob here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    locker_client::init_tracing();

    let Some(key) = args.key.filter(|k| !k.is_empty()) else {
        error!(target: "locker.client", "--key is required");
        return ExitCode::from(exit_code::MISSING_KEY);
    };

    match download(&args.auth, &key, args.out).await {
        Ok(bytes) => {
            info!(target: "locker.client", key = %key, bytes, "Download complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(target: "locker.client", error = %e, "Error processing request");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn download(auth: &AuthArgs, key: &str, out: Option<PathBuf>) -> Result<u64, ClientError> {
    let client = auth.blob_client()?;
    let download = client.get(key).await?;

    // The output file is only created once the store has answered 200
    match out {
        Some(path) => {
            let mut file = tokio::fs::File::create(&path).await?;
            download.write_to(&mut file).await
        }
        None => download.write_to(&mut tokio::io::stdout()).await,
    }
}
