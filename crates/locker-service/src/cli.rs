//! Command-line flags for the `locker-service` binary.
//!
//! Flags override the matching `COATLOCKER_*` environment variables; the
//! merged map is then handed to [`Config::from_vars`](crate::config::Config::from_vars).

use crate::config::{
    ENV_ADDRESS, ENV_AUTH_DISABLED, ENV_BASEDIR, ENV_CERTPATH, ENV_INSECURE, ENV_JWTCERTPATH,
    ENV_JWTCERTURL, ENV_KEYPATH, ENV_PORT,
};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;

/// Coatlocker - content-addressed blob store with JWT authentication
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding blob files
    #[arg(long)]
    pub basedir: Option<PathBuf>,

    /// IP address to listen on
    #[arg(long)]
    pub address: Option<String>,

    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// TLS certificate (PEM)
    #[arg(long)]
    pub certpath: Option<PathBuf>,

    /// TLS private key (PEM)
    #[arg(long)]
    pub keypath: Option<PathBuf>,

    /// Certificate used to verify JWTs, read from disk
    #[arg(long, conflicts_with = "jwtcerturl")]
    pub jwtcertpath: Option<PathBuf>,

    /// Certificate used to verify JWTs, fetched from the authentication service
    #[arg(long)]
    pub jwtcerturl: Option<String>,

    /// Serve without authentication
    #[arg(long)]
    pub auth_disabled: bool,

    /// Skip TLS verification when fetching the JWT certificate
    #[arg(long)]
    pub insecure: bool,
}

impl Args {
    /// Overlay the flags that were given onto `vars`.
    pub fn apply_to(&self, vars: &mut HashMap<String, String>) {
        let mut set = |name: &str, value: String| {
            vars.insert(name.to_string(), value);
        };

        if let Some(basedir) = &self.basedir {
            set(ENV_BASEDIR, basedir.display().to_string());
        }
        if let Some(address) = &self.address {
            set(ENV_ADDRESS, address.clone());
        }
        if let Some(port) = self.port {
            set(ENV_PORT, port.to_string());
        }
        if let Some(certpath) = &self.certpath {
            set(ENV_CERTPATH, certpath.display().to_string());
        }
        if let Some(keypath) = &self.keypath {
            set(ENV_KEYPATH, keypath.display().to_string());
        }
        if let Some(jwtcertpath) = &self.jwtcertpath {
            set(ENV_JWTCERTPATH, jwtcertpath.display().to_string());
        }
        if let Some(jwtcerturl) = &self.jwtcerturl {
            set(ENV_JWTCERTURL, jwtcerturl.clone());
        }
        if self.auth_disabled {
            set(ENV_AUTH_DISABLED, "true".to_string());
        }
        if self.insecure {
            set(ENV_INSECURE, "true".to_string());
        }
    }
}
