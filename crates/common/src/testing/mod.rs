//! Testing utilities and helpers
//!
//! - **[`mocks`]**: scripted token endpoint, authorization session, and a
//!   secret store with injectable failures
//!
//! Compiled for this crate's tests and for dependents that enable the
//! `test-utils` feature.

pub mod mocks;

pub use mocks::{FlakySecretStore, MockAuthorizationSession, MockOAuthClient};
