//! # AgentDodo Domain
//!
//! Business domain types and models for AgentDodo.
//!
//! This crate contains:
//! - Domain error types and Result definitions
//! - Configuration structures (X API endpoints, HTTP, keychain, logging)
//! - Remote post and user models returned by the X API
//! - Domain constants and post text validation
//!
//! ## Architecture
//! - No dependencies on other AgentDodo crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
