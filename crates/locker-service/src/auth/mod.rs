//! Token verification for the Blob Store.
//!
//! # Components
//!
//! - `key_resolver` - [`KeyResolver`] capability and the startup key loader
//! - `jwt` - [`JwtValidator`] applying size, algorithm, signature and time checks

pub mod jwt;
pub mod key_resolver;

pub use jwt::JwtValidator;
pub use key_resolver::{load_signing_key, KeyResolver, StaticKeyResolver};
