//! Blob Store configuration.
//!
//! Configuration is loaded from environment variables (optionally overlaid by
//! command-line flags, see [`crate::cli`]). [`Config::validate`] checks the
//! filesystem and must succeed before any listener binds.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default listen address.
pub const DEFAULT_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8443;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 90;

/// Default drain period in seconds after a shutdown signal.
pub const DEFAULT_DRAIN_SECONDS: u64 = 0;

pub const ENV_BASEDIR: &str = "COATLOCKER_BASEDIR";
pub const ENV_ADDRESS: &str = "COATLOCKER_ADDRESS";
pub const ENV_PORT: &str = "COATLOCKER_PORT";
pub const ENV_CERTPATH: &str = "COATLOCKER_CERTPATH";
pub const ENV_KEYPATH: &str = "COATLOCKER_KEYPATH";
pub const ENV_JWTCERTPATH: &str = "COATLOCKER_JWTCERTPATH";
pub const ENV_JWTCERTURL: &str = "COATLOCKER_JWTCERTURL";
pub const ENV_AUTH_DISABLED: &str = "COATLOCKER_AUTH_DISABLED";
pub const ENV_INSECURE: &str = "COATLOCKER_INSECURE";
pub const ENV_REQUEST_TIMEOUT_SECONDS: &str = "COATLOCKER_REQUEST_TIMEOUT_SECONDS";
pub const ENV_JWT_CLOCK_SKEW_SECONDS: &str = "JWT_CLOCK_SKEW_SECONDS";
pub const ENV_METRICS_ADDRESS: &str = "COATLOCKER_METRICS_ADDRESS";
pub const ENV_DRAIN_SECONDS: &str = "COATLOCKER_DRAIN_SECONDS";

/// Where the JWT signing certificate comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwtKeySource {
    /// Authentication disabled; every request is accepted.
    Disabled,

    /// PEM certificate on disk.
    File(PathBuf),

    /// PEM certificate served by the authentication service.
    Url { url: String, insecure: bool },
}

/// TLS certificate and private key used for serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Blob Store configuration.
#[derive(Clone)]
pub struct Config {
    /// Directory holding blob files.
    pub base_dir: PathBuf,

    /// Listen address (default: 127.0.0.1).
    pub address: IpAddr,

    /// Listen port (default: 8443).
    pub port: u16,

    /// TLS material; `None` serves plain HTTP.
    pub tls: Option<TlsPaths>,

    /// Source of the JWT signing key.
    pub jwt_key_source: JwtKeySource,

    /// Per-request timeout (default: 90s).
    pub request_timeout: Duration,

    /// Leeway for `exp`, `nbf` and `iat` checks.
    pub jwt_clock_skew: Duration,

    /// Optional listener serving Prometheus metrics.
    pub metrics_address: Option<SocketAddr>,

    /// Time to keep serving after a shutdown signal.
    pub drain_period: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The key path is redacted; it locates private key material.
        f.debug_struct("Config")
            .field("base_dir", &self.base_dir)
            .field("address", &self.address)
            .field("port", &self.port)
            .field(
                "tls",
                &self.tls.as_ref().map(|tls| {
                    format!("cert_path={}, key_path=[REDACTED]", tls.cert_path.display())
                }),
            )
            .field("jwt_key_source", &self.jwt_key_source)
            .field("request_timeout", &self.request_timeout)
            .field("jwt_clock_skew", &self.jwt_clock_skew)
            .field("metrics_address", &self.metrics_address)
            .field("drain_period", &self.drain_period)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Invalid TLS configuration: {0}")]
    InvalidTls(String),

    #[error("Invalid JWT key source: {0}")]
    InvalidJwtKeySource(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid request timeout: {0}")]
    InvalidRequestTimeout(String),

    #[error("Invalid metrics address: {0}")]
    InvalidMetricsAddress(String),

    #[error("Invalid drain period: {0}")]
    InvalidDrainPeriod(String),

    #[error("Invalid boolean for {name}: '{value}'")]
    InvalidBool { name: String, value: String },

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let base_dir = vars
            .get(ENV_BASEDIR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(ENV_BASEDIR.to_string()))?;

        let address = match vars.get(ENV_ADDRESS) {
            Some(value) => value.parse().map_err(|e| {
                ConfigError::InvalidAddress(format!(
                    "{ENV_ADDRESS} must be an IP address, got '{value}': {e}"
                ))
            })?,
            None => DEFAULT_ADDRESS,
        };

        let port = match vars.get(ENV_PORT) {
            Some(value) => value.parse().map_err(|e| {
                ConfigError::InvalidPort(format!(
                    "{ENV_PORT} must be a valid port number, got '{value}': {e}"
                ))
            })?,
            None => DEFAULT_PORT,
        };

        let cert_path = non_empty(vars, ENV_CERTPATH);
        let key_path = non_empty(vars, ENV_KEYPATH);
        let tls = match (cert_path, key_path) {
            (Some(cert_path), Some(key_path)) => Some(TlsPaths {
                cert_path: PathBuf::from(cert_path),
                key_path: PathBuf::from(key_path),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidTls(format!(
                    "{ENV_CERTPATH} and {ENV_KEYPATH} must be set together"
                )))
            }
        };

        let auth_disabled = parse_bool(vars, ENV_AUTH_DISABLED)?;
        let insecure = parse_bool(vars, ENV_INSECURE)?;
        let jwt_key_source = match (
            non_empty(vars, ENV_JWTCERTPATH),
            non_empty(vars, ENV_JWTCERTURL),
            auth_disabled,
        ) {
            (Some(_), Some(_), _) => {
                return Err(ConfigError::InvalidJwtKeySource(format!(
                    "{ENV_JWTCERTPATH} and {ENV_JWTCERTURL} are mutually exclusive"
                )))
            }
            (Some(_), None, true) | (None, Some(_), true) => {
                return Err(ConfigError::InvalidJwtKeySource(format!(
                    "{ENV_AUTH_DISABLED} cannot be combined with a JWT certificate source"
                )))
            }
            (Some(path), None, false) => JwtKeySource::File(PathBuf::from(path)),
            (None, Some(url), false) => JwtKeySource::Url {
                url: url.to_string(),
                insecure,
            },
            (None, None, true) => JwtKeySource::Disabled,
            (None, None, false) => {
                return Err(ConfigError::InvalidJwtKeySource(format!(
                    "one of {ENV_JWTCERTPATH} or {ENV_JWTCERTURL} is required \
                     unless {ENV_AUTH_DISABLED} is set"
                )))
            }
        };

        let request_timeout = match vars.get(ENV_REQUEST_TIMEOUT_SECONDS) {
            Some(value) => {
                let secs: u64 = value.parse().map_err(|e| {
                    ConfigError::InvalidRequestTimeout(format!(
                        "{ENV_REQUEST_TIMEOUT_SECONDS} must be a valid integer, got '{value}': {e}"
                    ))
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidRequestTimeout(format!(
                        "{ENV_REQUEST_TIMEOUT_SECONDS} must be greater than 0"
                    )));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        };

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew = if let Some(value) = vars.get(ENV_JWT_CLOCK_SKEW_SECONDS) {
            let secs: i64 = value.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "{ENV_JWT_CLOCK_SKEW_SECONDS} must be a valid integer, got '{value}': {e}"
                ))
            })?;

            if secs <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "{ENV_JWT_CLOCK_SKEW_SECONDS} must be positive, got {secs}"
                )));
            }

            let secs = secs.unsigned_abs();
            if secs > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "{ENV_JWT_CLOCK_SKEW_SECONDS} must not exceed {} seconds, got {secs}",
                    MAX_CLOCK_SKEW.as_secs()
                )));
            }

            Duration::from_secs(secs)
        } else {
            DEFAULT_CLOCK_SKEW
        };

        let metrics_address = match non_empty(vars, ENV_METRICS_ADDRESS) {
            Some(value) => Some(value.parse().map_err(|e| {
                ConfigError::InvalidMetricsAddress(format!(
                    "{ENV_METRICS_ADDRESS} must be a socket address, got '{value}': {e}"
                ))
            })?),
            None => None,
        };

        let drain_period = match vars.get(ENV_DRAIN_SECONDS) {
            Some(value) => Duration::from_secs(value.parse().map_err(|e| {
                ConfigError::InvalidDrainPeriod(format!(
                    "{ENV_DRAIN_SECONDS} must be a valid integer, got '{value}': {e}"
                ))
            })?),
            None => Duration::from_secs(DEFAULT_DRAIN_SECONDS),
        };

        Ok(Config {
            base_dir,
            address,
            port,
            tls,
            jwt_key_source,
            request_timeout,
            jwt_clock_skew,
            metrics_address,
            drain_period,
        })
    }

    /// Socket address the store listens on.
    #[must_use]
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    /// Check the filesystem state the store depends on.
    ///
    /// - the base directory exists and is a directory
    /// - with TLS, the certificate and key are regular files
    /// - with a file JWT source, the certificate is a regular file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the first failed check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_dir(&self.base_dir, "base directory")?;

        if let Some(tls) = &self.tls {
            require_file(&tls.cert_path, "TLS certificate")?;
            require_file(&tls.key_path, "TLS key")?;
        }

        if let JwtKeySource::File(path) = &self.jwt_key_source {
            require_file(path, "JWT certificate")?;
        }

        Ok(())
    }
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    vars.get(name).map(String::as_str).filter(|v| !v.is_empty())
}

fn parse_bool(vars: &HashMap<String, String>, name: &str) -> Result<bool, ConfigError> {
    match vars.get(name).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("" | "0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(_) => Err(ConfigError::InvalidBool {
            name: name.to_string(),
            value: vars.get(name).cloned().unwrap_or_default(),
        }),
    }
}

fn require_dir(path: &Path, what: &str) -> Result<(), ConfigError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ConfigError::Validation(format!(
            "{what} {} is not a directory",
            path.display()
        ))),
        Err(e) => Err(ConfigError::Validation(format!(
            "{what} {}: {e}",
            path.display()
        ))),
    }
}

fn require_file(path: &Path, what: &str) -> Result<(), ConfigError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(ConfigError::Validation(format!(
            "{what} {} is not a regular file",
            path.display()
        ))),
        Err(e) => Err(ConfigError::Validation(format!(
            "{what} {}: {e}",
            path.display()
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (ENV_BASEDIR.to_string(), "/var/lib/coatlocker".to_string()),
            (ENV_JWTCERTPATH.to_string(), "/etc/coatlocker/jwt.crt".to_string()),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.base_dir, PathBuf::from("/var/lib/coatlocker"));
        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(config.port, 8443);
        assert!(config.tls.is_none());
        assert_eq!(
            config.jwt_key_source,
            JwtKeySource::File(PathBuf::from("/etc/coatlocker/jwt.crt"))
        );
        assert_eq!(config.request_timeout, Duration::from_secs(90));
        assert_eq!(config.jwt_clock_skew, DEFAULT_CLOCK_SKEW);
        assert!(config.metrics_address.is_none());
        assert_eq!(config.drain_period, Duration::ZERO);
        assert_eq!(config.bind_address().to_string(), "127.0.0.1:8443");
    }

    #[test]
    fn test_from_vars_missing_basedir() {
        let mut vars = base_vars();
        vars.remove(ENV_BASEDIR);

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref name)) if name == ENV_BASEDIR)
        );
    }

    #[test]
    fn test_from_vars_custom_address_and_port() {
        let mut vars = base_vars();
        vars.insert(ENV_ADDRESS.to_string(), "0.0.0.0".to_string());
        vars.insert(ENV_PORT.to_string(), "9000".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.bind_address().to_string(), "0.0.0.0:9000");
    }

    #[test]
    fn test_from_vars_rejects_bad_port() {
        let mut vars = base_vars();
        vars.insert(ENV_PORT.to_string(), "70000".to_string());

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidPort(_))
        ));
    }

    #[test]
    fn test_from_vars_rejects_hostname_address() {
        let mut vars = base_vars();
        vars.insert(ENV_ADDRESS.to_string(), "localhost".to_string());

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_tls_requires_both_paths() {
        let mut vars = base_vars();
        vars.insert(ENV_CERTPATH.to_string(), "/etc/tls.crt".to_string());

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidTls(_))
        ));

        vars.insert(ENV_KEYPATH.to_string(), "/etc/tls.key".to_string());
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(
            config.tls,
            Some(TlsPaths {
                cert_path: PathBuf::from("/etc/tls.crt"),
                key_path: PathBuf::from("/etc/tls.key"),
            })
        );
    }

    #[test]
    fn test_jwt_sources_are_exclusive() {
        let mut vars = base_vars();
        vars.insert(ENV_JWTCERTURL.to_string(), "https://auth/jwt.crt".to_string());

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwtKeySource(_))
        ));
    }

    #[test]
    fn test_jwt_url_source_carries_insecure_flag() {
        let mut vars = base_vars();
        vars.remove(ENV_JWTCERTPATH);
        vars.insert(ENV_JWTCERTURL.to_string(), "https://auth/jwt.crt".to_string());
        vars.insert(ENV_INSECURE.to_string(), "true".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(
            config.jwt_key_source,
            JwtKeySource::Url {
                url: "https://auth/jwt.crt".to_string(),
                insecure: true,
            }
        );
    }

    #[test]
    fn test_missing_jwt_source_requires_explicit_opt_out() {
        let mut vars = base_vars();
        vars.remove(ENV_JWTCERTPATH);

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwtKeySource(_))
        ));

        vars.insert(ENV_AUTH_DISABLED.to_string(), "1".to_string());
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.jwt_key_source, JwtKeySource::Disabled);
    }

    #[test]
    fn test_auth_disabled_conflicts_with_source() {
        let mut vars = base_vars();
        vars.insert(ENV_AUTH_DISABLED.to_string(), "true".to_string());

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwtKeySource(_))
        ));
    }

    #[test]
    fn test_invalid_bool_is_rejected() {
        let mut vars = base_vars();
        vars.insert(ENV_INSECURE.to_string(), "maybe".to_string());

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidBool { .. })
        ));
    }

    #[test]
    fn test_request_timeout_must_be_positive() {
        let mut vars = base_vars();
        vars.insert(ENV_REQUEST_TIMEOUT_SECONDS.to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidRequestTimeout(_))
        ));

        vars.insert(ENV_REQUEST_TIMEOUT_SECONDS.to_string(), "5".to_string());
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_jwt_clock_skew_bounds() {
        let mut vars = base_vars();

        vars.insert(ENV_JWT_CLOCK_SKEW_SECONDS.to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwtClockSkew(_))
        ));

        vars.insert(ENV_JWT_CLOCK_SKEW_SECONDS.to_string(), "601".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwtClockSkew(_))
        ));

        vars.insert(ENV_JWT_CLOCK_SKEW_SECONDS.to_string(), "600".to_string());
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.jwt_clock_skew, Duration::from_secs(600));
    }

    #[test]
    fn test_metrics_address_parses() {
        let mut vars = base_vars();
        vars.insert(ENV_METRICS_ADDRESS.to_string(), "127.0.0.1:8887".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(
            config.metrics_address.map(|a| a.to_string()),
            Some("127.0.0.1:8887".to_string())
        );

        vars.insert(ENV_METRICS_ADDRESS.to_string(), "not-an-address".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidMetricsAddress(_))
        ));
    }

    #[test]
    fn test_debug_redacts_key_path() {
        let mut vars = base_vars();
        vars.insert(ENV_CERTPATH.to_string(), "/etc/tls.crt".to_string());
        vars.insert(ENV_KEYPATH.to_string(), "/etc/secret-dir/tls.key".to_string());

        let config = Config::from_vars(&vars).unwrap();
        let debug_str = format!("{config:?}");

        assert!(debug_str.contains("/etc/tls.crt"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("secret-dir"));
    }

    // -------------------------------------------------------------------------
    // validate Tests
    // -------------------------------------------------------------------------

    fn config_for(base_dir: &Path) -> Config {
        let vars = HashMap::from([
            (ENV_BASEDIR.to_string(), base_dir.display().to_string()),
            (ENV_AUTH_DISABLED.to_string(), "true".to_string()),
        ]);
        Config::from_vars(&vars).unwrap()
    }

    #[test]
    fn test_validate_accepts_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(config_for(dir.path()).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        assert!(matches!(
            config_for(&missing).validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_file_as_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("blob");
        std::fs::write(&file, b"x").unwrap();

        assert!(matches!(
            config_for(&file).validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_checks_tls_files() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("tls.crt");
        std::fs::write(&cert, b"cert").unwrap();

        let mut config = config_for(dir.path());
        config.tls = Some(TlsPaths {
            cert_path: cert,
            key_path: dir.path().join("missing.key"),
        });

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("TLS key"));
    }

    #[test]
    fn test_validate_checks_jwt_certificate_file() {
        let dir = tempfile::tempdir().unwrap();

        let mut config = config_for(dir.path());
        config.jwt_key_source = JwtKeySource::File(dir.path().to_path_buf());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("JWT certificate"));
    }
}
