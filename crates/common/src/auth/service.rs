//! High-level OAuth 2.0 service orchestrator
//!
//! Combines the authorization session, PKCE, and the token manager into the
//! operations the posting use cases call: begin authorization, get a token,
//! check authentication, log out.

use std::sync::Arc;

use tracing::{info, warn};

use super::error::AuthError;
use super::pkce::{authorization_url_with_state, generate_pkce, generate_state};
use super::session::{parse_callback, AuthorizationError, AuthorizationSession};
use super::token_manager::TokenManager;
use super::traits::OAuthClientTrait;
use super::types::ClientId;
use crate::security::{SecretKey, SecretStore};

/// OAuth 2.0 service for desktop authentication
///
/// # Type Parameters
/// * `C` - Token endpoint client
/// * `S` - Secret store
pub struct AuthService<C: OAuthClientTrait, S: SecretStore> {
    token_manager: Arc<TokenManager<C, S>>,
    session: Arc<dyn AuthorizationSession>,
}

impl<C: OAuthClientTrait, S: SecretStore> AuthService<C, S> {
    pub fn new(
        token_manager: Arc<TokenManager<C, S>>,
        session: Arc<dyn AuthorizationSession>,
    ) -> Self {
        Self { token_manager, session }
    }

    #[must_use]
    pub const fn token_manager(&self) -> &Arc<TokenManager<C, S>> {
        &self.token_manager
    }

    /// Load persisted tokens. Call once at startup.
    ///
    /// # Errors
    /// Returns error if the secret store cannot be read
    pub async fn initialize(&self) -> Result<(), AuthError> {
        self.token_manager.initialize().await?;
        Ok(())
    }

    /// Authorize with a client id the user entered.
    ///
    /// Runs the full PKCE flow: authorize URL, interactive session, callback
    /// parsing, code exchange. An empty `scopes` slice requests the
    /// configured defaults.
    ///
    /// # Errors
    /// - `Authorization(Cancelled)` if the user closed the session
    /// - `Authorization(MissingCallbackUrl | MissingAuthorizationCode | ..)`
    ///   for a bad callback, in which case no exchange is attempted
    /// - `Token(ExchangeFailed)` if the provider rejects the code
    pub async fn begin_authorization(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<(), AuthError> {
        if client_id.trim().is_empty() {
            return Err(AuthError::NotConfigured("client id is empty".to_string()));
        }
        let client_id = ClientId::Configured(client_id.trim().to_string());
        self.authorize(client_id, redirect_uri, scopes).await
    }

    /// Authorize with whichever client id is in effect (configured, else
    /// built-in) and the configured redirect URI and scopes.
    ///
    /// # Errors
    /// `NotConfigured` if neither a configured nor a built-in client id
    /// exists, otherwise as [`begin_authorization`](Self::begin_authorization)
    pub async fn begin_default_authorization(&self) -> Result<(), AuthError> {
        let client_id = self
            .token_manager
            .resolve_client_id()
            .await?
            .ok_or_else(|| AuthError::NotConfigured("no OAuth client id".to_string()))?;
        let redirect_uri = self.token_manager.oauth_client().config().redirect_uri.clone();
        self.authorize(client_id, &redirect_uri, &[]).await
    }

    async fn authorize(
        &self,
        client_id: ClientId,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<(), AuthError> {
        let guard = self.token_manager.begin_configuring();
        let config = self.token_manager.oauth_client().config();
        let scopes = if scopes.is_empty() { config.scopes.as_slice() } else { scopes };

        let pkce = generate_pkce();
        let state = generate_state();
        let url = authorization_url_with_state(
            &config.authorize_url,
            client_id.as_str(),
            redirect_uri,
            &pkce.code_challenge,
            scopes,
            &state,
        );

        info!(built_in_client = !client_id.is_configured(), "Starting OAuth 2.0 authorization");

        let callback = match self.session.present(&url, &config.callback_scheme).await {
            Ok(Some(callback)) => callback,
            Ok(None) => return Err(AuthorizationError::MissingCallbackUrl.into()),
            Err(e) if e.is_cancelled() => {
                info!("Authorization cancelled by user");
                return Err(e.into());
            }
            Err(e) => {
                warn!(error = %e, "Authorization session failed");
                return Err(e.into());
            }
        };

        let code = parse_callback(&callback, &state)?;
        self.token_manager
            .complete_authorization(&client_id, &code, &pkce.code_verifier, redirect_uri)
            .await?;
        guard.commit();
        Ok(())
    }

    /// Persist a user-entered client id without authorizing.
    ///
    /// # Errors
    /// Returns error if the secret store write fails
    pub async fn configure_client_id(&self, client_id: &str) -> Result<(), AuthError> {
        if client_id.trim().is_empty() {
            return Err(AuthError::NotConfigured("client id is empty".to_string()));
        }
        self.token_manager.store().save(SecretKey::ClientId, client_id.trim()).await?;
        Ok(())
    }

    /// Valid access token, refreshing if needed.
    ///
    /// # Errors
    /// Returns error if the user has to authorize again
    pub async fn get_access_token(&self) -> Result<String, AuthError> {
        Ok(self.token_manager.get_valid_access_token().await?)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token_manager.is_authenticated().await
    }

    /// Always succeeds locally. See [`TokenManager::logout`].
    pub async fn logout(&self) {
        self.token_manager.logout().await;
    }
}
