//! OAuth 2.0 token endpoint client
//!
//! Handles the HTTP half of the PKCE flow:
//! - Authorization code exchange
//! - Token refresh
//! - Best-effort token revocation
//!
//! All three are form-encoded POSTs, as the X OAuth 2.0 endpoints require.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use super::pkce::{build_authorization_url, AuthorizationRequest};
use super::traits::OAuthClientTrait;
use super::types::{OAuthConfig, OAuthError, TokenResponse, TokenSet};

const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for token endpoint operations
#[derive(Debug, Error)]
pub enum OAuthClientError {
    /// The request never produced a response
    #[error("token request failed: {0}")]
    RequestFailed(String),

    /// The request timed out
    #[error("token request timed out")]
    Timeout,

    /// The provider answered with an OAuth error body
    #[error("OAuth error ({status}): {error}")]
    OAuthError { status: u16, error: OAuthError },

    /// The provider answered with a non-OAuth failure
    #[error("token endpoint returned HTTP {status}")]
    HttpError { status: u16, body: Option<String> },

    /// Failed to parse response
    #[error("failed to parse token response: {0}")]
    ParseError(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl OAuthClientError {
    /// Whether the provider answered and refused the grant, as opposed to
    /// never being reached or failing on its side.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::OAuthError { .. } | Self::HttpError { status: 400..=499, .. })
    }
}

impl From<reqwest::Error> for OAuthClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::RequestFailed(err.to_string())
        }
    }
}

/// OAuth 2.0 client for a public (secret-less) PKCE client
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    client: Client,
}

impl OAuthClient {
    /// Create a client with its own HTTP connection pool.
    ///
    /// # Errors
    /// Returns `ConfigError` if the HTTP client cannot be built
    pub fn new(config: OAuthConfig) -> Result<Self, OAuthClientError> {
        let client = Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                OAuthClientError::ConfigError(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { config, client })
    }

    /// Reuse an existing `reqwest::Client`.
    #[must_use]
    pub const fn with_client(config: OAuthConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Authorize URL for this provider with a fresh `state`.
    #[must_use]
    pub fn authorization_request(
        &self,
        client_id: &str,
        redirect_uri: &str,
        code_challenge: &str,
        scopes: &[String],
    ) -> AuthorizationRequest {
        build_authorization_url(
            &self.config.authorize_url,
            client_id,
            redirect_uri,
            code_challenge,
            scopes,
        )
    }

    async fn request_tokens(
        &self,
        grant: &str,
        params: &[(&str, &str)],
    ) -> Result<TokenSet, OAuthClientError> {
        debug!(grant = grant, token_url = %self.config.token_url, "Requesting tokens");

        let response = self.client.post(&self.config.token_url).form(params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<OAuthError>(&body) {
                Ok(error) => OAuthClientError::OAuthError { status: status.as_u16(), error },
                Err(_) => OAuthClientError::HttpError {
                    status: status.as_u16(),
                    body: (!body.is_empty()).then_some(body),
                },
            });
        }

        let token_response: TokenResponse =
            serde_json::from_str(&body).map_err(|e| OAuthClientError::ParseError(e.to_string()))?;
        debug!(grant = grant, expires_in = token_response.expires_in, "Token request succeeded");
        Ok(TokenSet::from_response(token_response, Utc::now()))
    }
}

#[async_trait]
impl OAuthClientTrait for OAuthClient {
    fn config(&self) -> &OAuthConfig {
        &self.config
    }

    async fn exchange_code_for_tokens(
        &self,
        client_id: &str,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        self.request_tokens(
            "authorization_code",
            &[
                ("grant_type", "authorization_code"),
                ("client_id", client_id),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("code_verifier", code_verifier),
            ],
        )
        .await
    }

    async fn refresh_access_token(
        &self,
        client_id: &str,
        refresh_token: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        if refresh_token.is_empty() {
            return Err(OAuthClientError::ConfigError("refresh token is empty".to_string()));
        }
        self.request_tokens(
            "refresh_token",
            &[
                ("grant_type", "refresh_token"),
                ("client_id", client_id),
                ("refresh_token", refresh_token),
            ],
        )
        .await
    }

    async fn revoke_token(&self, client_id: &str, token: &str) -> Result<(), OAuthClientError> {
        let response = self
            .client
            .post(&self.config.revoke_url)
            .form(&[
                ("token", token),
                ("client_id", client_id),
                ("token_type_hint", "access_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("Token revoked");
            Ok(())
        } else {
            warn!(status = status.as_u16(), "Token revocation rejected");
            Err(OAuthClientError::HttpError { status: status.as_u16(), body: None })
        }
    }
}
