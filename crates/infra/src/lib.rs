//! # AgentDodo Infrastructure
//!
//! Everything that touches the network or the process environment.
//!
//! This crate contains:
//! - The HTTP transport (reqwest)
//! - The authenticated request executor and X endpoint definitions
//! - The X API client exposing the posting operations
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Auth core (signing, PKCE, token lifecycle, secret storage) lives in
//!   `agentdodo-common`
//! - Plain types and the domain error live in `agentdodo-domain`

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod x;

// Re-export commonly used items
pub use api::{ApiClient, ApiError, ApiErrorCategory, XEndpoint};
pub use errors::InfraError;
pub use http::{HttpClient, HttpTransport, TransportError};
pub use observability::init_tracing;
pub use x::{XAccount, XApiClient, XError};
