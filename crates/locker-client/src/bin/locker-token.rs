//! Print a verified token from the authentication service.

use clap::Parser;
use common::secret::ExposeSecret;
use locker_client::{exit_code, AuthArgs};
use std::process::ExitCode;
use tracing::error;

#[derive(Parser, Debug)]
#[command(
    name = "locker-token",
    version,
    about = "Fetch a token, verify it against --jwtcertpath and print it"
)]
struct Args {
    #[command(flatten)]
    auth: AuthArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    locker_client::init_tracing();

    let Some(cert_path) = args.auth.jwtcertpath.as_deref() else {
        error!(target: "locker.client", "--jwtcertpath is required");
        return ExitCode::from(exit_code::MISSING_JWT_CERT);
    };

    let client = match args.auth.credential_client(cert_path) {
        Ok(client) => client,
        Err(e) => {
            error!(target: "locker.client", error = %e, "Unable to create credential client");
            return ExitCode::from(exit_code::AUTH_FAILED);
        }
    };

    match client.retrieve_token().await {
        Ok(token) => {
            println!("{}", token.expose_secret());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(target: "locker.client", error = %e, "Error authenticating");
            ExitCode::from(exit_code::AUTH_FAILED)
        }
    }
}
