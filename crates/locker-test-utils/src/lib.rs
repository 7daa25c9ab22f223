//! # Locker Test Utilities
//!
//! Shared test utilities for the Coatlocker workspace.
//!
//! This crate provides:
//! - Fixed RSA/X.509 fixtures (a trusted "primary" pair and a foreign "rogue" pair)
//! - Test token builder (`TestTokenBuilder`) signing RS256 tokens
//! - Server test harness (`TestLockerServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use locker_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestLockerServer::spawn().await?;
//!     let token = TestTokenBuilder::new().for_user("alice").sign();
//!
//!     let response = reqwest::Client::new()
//!         .put(format!("{}/data", server.url()))
//!         .bearer_auth(&token)
//!         .body("payload")
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 201);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
