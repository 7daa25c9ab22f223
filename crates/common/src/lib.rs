//! Common utilities shared by the coatlocker store and its clients.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT verification (claims, size limits, clock skew)
pub mod jwt;

/// Module for loading the RS256 signing key from X.509 certificates
pub mod signing_key;

/// Module for obtaining and caching tokens from the authentication service
pub mod credential_client;
