//! Authenticated X API access
//!
//! This module provides the request executor and what it is built from:
//! credential providers, the endpoint abstraction and the error taxonomy.
//!
//! # Architecture
//!
//! - Goes through [`crate::http::HttpTransport`] (no direct reqwest)
//! - OAuth 2.0 bearer tokens with one refresh-and-retry on 401
//! - OAuth 1.0a HMAC-SHA1 signed headers, no retry
//! - Status and transport failures mapped onto [`ApiError`]

pub mod auth;
pub mod client;
pub mod endpoint;
pub mod errors;

pub use auth::{AccessTokenProvider, RequestAuth, SignerProvider};
pub use client::{ApiClient, ApiClientBuilder, ApiClientConfig, PreparedRequest};
pub use endpoint::{ApiEndpoint, ApiHost, RequestBody, TimeoutClass, XEndpoint};
pub use errors::{ApiError, ApiErrorCategory, ProblemDetails};
