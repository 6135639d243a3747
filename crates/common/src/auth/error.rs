//! Errors surfaced to callers of the authentication API

use thiserror::Error;

use super::client::OAuthClientError;
use super::oauth1::SignatureError;
use super::session::AuthorizationError;
use super::token_manager::TokenManagerError;
use crate::security::StorageError;

/// Authentication failures, as seen by the posting use cases.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Credentials are missing; the user must configure or authorize
    #[error("credentials not configured: {0}")]
    NotConfigured(String),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error(transparent)]
    Token(#[from] TokenManagerError),

    #[error(transparent)]
    OAuth(#[from] OAuthClientError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The operation does not apply to the configured scheme
    #[error("{0} is not supported by the configured authentication scheme")]
    Unsupported(&'static str),
}

impl AuthError {
    /// True when the user dismissed the authorization session.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Authorization(e) if e.is_cancelled())
    }
}
