//! Traits for OAuth token endpoint operations
//!
//! Abstracts the provider's token endpoint so the token lifecycle can be
//! tested without a network.

use async_trait::async_trait;

use super::client::OAuthClientError;
use super::types::{OAuthConfig, TokenSet};

/// OAuth 2.0 token endpoint operations
#[async_trait]
pub trait OAuthClientTrait: Send + Sync {
    /// Provider endpoints and redirect settings.
    fn config(&self) -> &OAuthConfig;

    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    /// Returns error if the exchange is rejected or the response cannot be
    /// parsed
    async fn exchange_code_for_tokens(
        &self,
        client_id: &str,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenSet, OAuthClientError>;

    /// Obtain a new token set with a refresh token
    ///
    /// # Errors
    /// Returns error if refresh fails or the refresh token was revoked
    async fn refresh_access_token(
        &self,
        client_id: &str,
        refresh_token: &str,
    ) -> Result<TokenSet, OAuthClientError>;

    /// Revoke a token. Callers treat failures as non-fatal.
    async fn revoke_token(&self, client_id: &str, token: &str) -> Result<(), OAuthClientError>;
}
