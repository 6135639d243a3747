//! Authentication and secret storage shared across AgentDodo crates.
//!
//! # Modules
//!
//! - [`auth`]: OAuth 1.0a signing, OAuth 2.0 PKCE, token lifecycle
//! - [`security`]: the `SecretStore` seam and its backends
//! - `testing` (feature `test-utils`): mocks for the auth seams
//!
//! # Features
//!
//! - `platform`: OS keychain backend via `keyring`
//! - `test-utils`: expose the `testing` module to dependents

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod security;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
pub use auth::{AuthError, AuthService, OAuth1Account, OAuth1Signer, TokenManager};
#[cfg(feature = "platform")]
pub use security::KeychainProvider;
pub use security::{InMemorySecretStore, SecretKey, SecretStore, StorageError};
