//! Coatlocker Blob Store library.
//!
//! Content-addressed blob storage over HTTP(S). Each blob is stored under the
//! hex SHA-256 of its request URI; every route except `GET /health` requires an
//! RS256 bearer token issued by the authentication service.

pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod storage;
