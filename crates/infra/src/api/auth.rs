//! Credential sources for the request executor
//!
//! The auth scheme is picked once, when the client is built, as a
//! [`RequestAuth`] variant. Each variant wraps the provider for that scheme.

use std::sync::Arc;

use agentdodo_common::auth::{
    AuthError, OAuth1Account, OAuth1Signer, OAuthClientTrait, TokenManager, TokenManagerError,
};
use agentdodo_common::security::SecretStore;
use agentdodo_domain::AuthScheme;
use async_trait::async_trait;

use super::errors::ApiError;

/// Trait for providing OAuth 2.0 access tokens
///
/// This trait allows dependency injection and testing with mock providers.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// A valid access token, refreshing first if needed.
    async fn access_token(&self) -> Result<String, ApiError>;

    /// Called once after the API answered 401 for `rejected`.
    async fn refresh_rejected(&self, rejected: &str) -> Result<String, ApiError>;
}

/// Source of an OAuth 1.0a signer.
#[async_trait]
pub trait SignerProvider: Send + Sync {
    async fn signer(&self) -> Result<OAuth1Signer, ApiError>;
}

/// Signing strategy, one per scheme.
#[derive(Clone)]
pub enum RequestAuth {
    OAuth1(Arc<dyn SignerProvider>),
    OAuth2(Arc<dyn AccessTokenProvider>),
}

impl RequestAuth {
    pub const fn scheme(&self) -> AuthScheme {
        match self {
            Self::OAuth1(_) => AuthScheme::OAuth1,
            Self::OAuth2(_) => AuthScheme::OAuth2,
        }
    }
}

impl std::fmt::Debug for RequestAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RequestAuth").field(&self.scheme()).finish()
    }
}

#[async_trait]
impl<C: OAuthClientTrait, S: SecretStore> AccessTokenProvider for TokenManager<C, S> {
    async fn access_token(&self) -> Result<String, ApiError> {
        self.get_valid_access_token().await.map_err(token_error)
    }

    async fn refresh_rejected(&self, rejected: &str) -> Result<String, ApiError> {
        TokenManager::refresh_rejected(self, rejected).await.map_err(token_error)
    }
}

#[async_trait]
impl<S: SecretStore> SignerProvider for OAuth1Account<S> {
    async fn signer(&self) -> Result<OAuth1Signer, ApiError> {
        OAuth1Account::signer(self).await.map_err(|err| match err {
            AuthError::NotConfigured(_) => ApiError::NotConfigured,
            AuthError::Storage(e) => ApiError::Storage(e.to_string()),
            other => ApiError::Signature(other.to_string()),
        })
    }
}

fn token_error(err: TokenManagerError) -> ApiError {
    match err {
        TokenManagerError::NotAuthenticated | TokenManagerError::MissingClientId => {
            ApiError::NotConfigured
        }
        TokenManagerError::NoRefreshToken
        | TokenManagerError::RefreshFailed(_)
        | TokenManagerError::ExchangeFailed(_) => ApiError::Unauthorized,
        TokenManagerError::Storage(e) => ApiError::Storage(e.to_string()),
    }
}
