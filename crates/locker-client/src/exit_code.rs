//! Process exit codes shared by the CLI tools.

/// `--file` was not given.
pub const MISSING_FILE: u8 = 1;

/// `--key` was not given.
pub const MISSING_KEY: u8 = 2;

/// The request to the Blob Store failed.
pub const REQUEST_FAILED: u8 = 3;

/// Obtaining or presenting a token failed.
pub const AUTH_FAILED: u8 = 4;

/// `locker-token` was run without `--jwtcertpath`.
pub const MISSING_JWT_CERT: u8 = 5;
