//! Upload a file to the Coatlocker Blob Store.

use clap::Parser;
use locker_client::{exit_code, AuthArgs};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "locker-put", version, about = "Upload a file to the Coatlocker Blob Store")]
struct Args {
    #[command(flatten)]
    auth: AuthArgs,

    /// File to upload
    #[arg(long)]
    file: Option<PathBuf>,

    /// Key to store the file under
    #[arg(long)]
    key: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    locker_client::init_tracing();

    let Some(file) = args.file.filter(|f| !f.as_os_str().is_empty()) else {
        error!(target: "locker.client", "--file is required");
        return ExitCode::from(exit_code::MISSING_FILE);
    };
    let Some(key) = args.key.filter(|k| !k.is_empty()) else {
        error!(target: "locker.client", "--key is required");
        return ExitCode::from(exit_code::MISSING_KEY);
    };

    let client = match args.auth.blob_client() {
        Ok(client) => client,
        Err(e) => {
            error!(target: "locker.client", error = %e, "Failed to create client");
            return ExitCode::from(e.exit_code());
        }
    };

    match client.put_file(&key, &file).await {
        Ok(()) => {
            info!(target: "locker.client", key = %key, file = %file.display(), "Upload complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(target: "locker.client", error = %e, "Error processing request");
            ExitCode::from(e.exit_code())
        }
    }
}
