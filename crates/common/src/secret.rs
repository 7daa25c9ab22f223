//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for passwords and bearer tokens.
//! `SecretString` implements `Debug` with redaction, so any struct deriving
//! `Debug` around it is safe to log. Values are zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct BasicCredentials {
//!     username: String,
//!     password: SecretString,
//! }
//!
//! let creds = BasicCredentials {
//!     username: "admin".to_string(),
//!     password: SecretString::from("hunter2"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("hunter2"));
//! assert_eq!(creds.password.expose_secret(), "hunter2");
//! ```
//!
//! Use `SecretString` for:
//! - Basic-auth passwords sent to the authentication service
//! - Bearer tokens held by the credential client and CLI tools

pub use secrecy::{ExposeSecret, SecretString};
