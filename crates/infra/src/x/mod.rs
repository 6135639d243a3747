//! X API client
//!
//! The operations the posting use cases call. Each one validates its input,
//! goes through the [`ApiClient`] executor with whichever scheme was chosen
//! at construction, and decodes the `{"data": ...}` envelope.

pub mod models;

use std::sync::Arc;

use agentdodo_common::auth::{
    AuthError, AuthService, AuthorizationSession, OAuth1Account, OAuth1Credentials, OAuthClient,
    OAuthClientTrait, OAuthConfig, TokenManager,
};
use agentdodo_common::security::{KeychainProvider, SecretKey, SecretStore};
use agentdodo_domain::{validate_post_text, AuthScheme, Config, RemotePost, User};
use thiserror::Error;
use tracing::{info, instrument, warn};

pub use models::{Deleted, Envelope, MediaUploadSession, PageMeta, PostPage};

use crate::api::{
    AccessTokenProvider, ApiClient, ApiClientConfig, ApiError, RequestAuth, SignerProvider,
    XEndpoint,
};
use crate::http::{HttpClient, HttpTransport};

/// Errors of the caller-facing operations
#[derive(Debug, Error)]
pub enum XError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl XError {
    /// The user closed the authorization session. Not worth an error toast.
    pub const fn is_cancelled(&self) -> bool {
        match self {
            Self::Auth(e) => e.is_cancelled(),
            Self::Api(e) => matches!(e, ApiError::Cancelled),
            Self::Config(_) => false,
        }
    }

    pub const fn requires_reauthorization(&self) -> bool {
        match self {
            Self::Api(e) => e.requires_reauthorization(),
            Self::Auth(AuthError::NotConfigured(_) | AuthError::Token(_)) => true,
            _ => false,
        }
    }
}

/// The configured account, one variant per auth scheme.
pub enum XAccount<C: OAuthClientTrait, S: SecretStore> {
    OAuth1(Arc<OAuth1Account<S>>),
    OAuth2(Arc<AuthService<C, S>>),
}

impl<C: OAuthClientTrait, S: SecretStore> Clone for XAccount<C, S> {
    fn clone(&self) -> Self {
        match self {
            Self::OAuth1(account) => Self::OAuth1(Arc::clone(account)),
            Self::OAuth2(service) => Self::OAuth2(Arc::clone(service)),
        }
    }
}

impl<C: OAuthClientTrait, S: SecretStore> XAccount<C, S> {
    pub const fn scheme(&self) -> AuthScheme {
        match self {
            Self::OAuth1(_) => AuthScheme::OAuth1,
            Self::OAuth2(_) => AuthScheme::OAuth2,
        }
    }
}

/// Client for the X API
///
/// # Type Parameters
/// * `C` - OAuth 2.0 token endpoint client
/// * `S` - Secret store
pub struct XApiClient<C: OAuthClientTrait, S: SecretStore> {
    api: ApiClient,
    account: XAccount<C, S>,
    store: Arc<S>,
}

impl XApiClient<OAuthClient, KeychainProvider> {
    /// Compose the client from configuration, with the OS keychain as the
    /// secret store.
    ///
    /// # Errors
    /// `Config` if the configuration is invalid, otherwise a failure to
    /// build one of the HTTP clients
    pub fn from_config(
        config: &Config,
        session: Arc<dyn AuthorizationSession>,
    ) -> Result<Self, XError> {
        config.validate().map_err(|e| XError::Config(e.to_string()))?;

        let store = Arc::new(KeychainProvider::new(config.keychain.service.clone()));
        let account = match config.x.auth_scheme {
            AuthScheme::OAuth1 => {
                XAccount::OAuth1(Arc::new(OAuth1Account::new(Arc::clone(&store))))
            }
            AuthScheme::OAuth2 => {
                let oauth_config = OAuthConfig {
                    authorize_url: config.x.authorize_url.clone(),
                    token_url: config.x.token_url.clone(),
                    revoke_url: config.x.revoke_url.clone(),
                    redirect_uri: config.x.redirect_uri.clone(),
                    callback_scheme: config.x.callback_scheme.clone(),
                    scopes: config.x.scopes.clone(),
                };
                let oauth_client = OAuthClient::new(oauth_config).map_err(AuthError::from)?;
                let manager = TokenManager::new(
                    Arc::new(oauth_client),
                    Arc::clone(&store),
                    config.x.default_client_id.clone(),
                    config.x.refresh_skew_secs,
                );
                XAccount::OAuth2(Arc::new(AuthService::new(Arc::new(manager), session)))
            }
        };

        let transport = HttpClient::builder()
            .timeout(std::time::Duration::from_secs(config.http.upload_timeout_secs))
            .user_agent(config.http.user_agent.clone())
            .build()
            .map_err(ApiError::from)?;

        info!(
            scheme = ?config.x.auth_scheme,
            keychain = %config.keychain.service,
            "X API client configured"
        );
        let api_config = ApiClientConfig::from_config(&config.x, &config.http);
        Ok(Self::new(api_config, Arc::new(transport), account, store))
    }
}

impl<C, S> XApiClient<C, S>
where
    C: OAuthClientTrait + 'static,
    S: SecretStore + 'static,
{
    pub fn new(
        config: ApiClientConfig,
        transport: Arc<dyn HttpTransport>,
        account: XAccount<C, S>,
        store: Arc<S>,
    ) -> Self {
        let auth = match &account {
            XAccount::OAuth1(account) => {
                RequestAuth::OAuth1(Arc::clone(account) as Arc<dyn SignerProvider>)
            }
            XAccount::OAuth2(service) => {
                let manager = Arc::clone(service.token_manager());
                RequestAuth::OAuth2(manager as Arc<dyn AccessTokenProvider>)
            }
        };
        Self { api: ApiClient::new(config, transport, auth), account, store }
    }

    pub const fn account(&self) -> &XAccount<C, S> {
        &self.account
    }

    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Load persisted credentials. Call once at startup.
    ///
    /// # Errors
    /// Returns error if the secret store cannot be read
    pub async fn initialize(&self) -> Result<(), XError> {
        match &self.account {
            XAccount::OAuth1(account) => {
                let configured = account.load().await?;
                info!(configured, "OAuth 1.0a account loaded");
            }
            XAccount::OAuth2(service) => service.initialize().await?,
        }
        Ok(())
    }

    /// Publish a post.
    ///
    /// # Errors
    /// `InvalidRequest` for empty or over-long text (no request is sent),
    /// otherwise any [`ApiError`]
    #[instrument(skip(self, text))]
    pub async fn create_post(&self, text: &str) -> Result<RemotePost, XError> {
        self.publish(text, None).await
    }

    /// Publish a post as a reply to `in_reply_to`.
    #[instrument(skip(self, text))]
    pub async fn create_reply(&self, text: &str, in_reply_to: &str) -> Result<RemotePost, XError> {
        self.publish(text, Some(in_reply_to)).await
    }

    async fn publish(&self, text: &str, reply_to: Option<&str>) -> Result<RemotePost, XError> {
        let text = validate_post_text(text).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let endpoint = XEndpoint::CreatePost {
            text: text.to_string(),
            reply_to: reply_to.map(str::to_string),
        };
        let created: Envelope<RemotePost> = self.api.execute(&endpoint).await?;
        info!(post_id = %created.data.id, "Post created");
        Ok(created.data)
    }

    /// Returns whether the post was deleted.
    pub async fn delete_post(&self, id: &str) -> Result<bool, XError> {
        let endpoint = XEndpoint::DeletePost { id: id.to_string() };
        let result: Envelope<Deleted> = self.api.execute(&endpoint).await?;
        Ok(result.data.deleted)
    }

    pub async fn get_post(&self, id: &str) -> Result<RemotePost, XError> {
        let endpoint = XEndpoint::GetPost { id: id.to_string() };
        let post: Envelope<RemotePost> = self.api.execute(&endpoint).await?;
        Ok(post.data)
    }

    /// The authenticated user. The username is remembered in the secret
    /// store for display before the next network round trip.
    ///
    /// # Errors
    /// Any [`ApiError`]; failing to store the username is only logged
    #[instrument(skip(self))]
    pub async fn get_current_user(&self) -> Result<User, XError> {
        let user: Envelope<User> = self.api.execute(&XEndpoint::CurrentUser).await?;
        if let Err(e) = self.store.save(SecretKey::Username, &user.data.username).await {
            warn!(error = %e, "Failed to remember username");
        }
        Ok(user.data)
    }

    /// Check the credentials against the API; returns the username.
    pub async fn verify_credentials(&self) -> Result<String, XError> {
        Ok(self.get_current_user().await?.username)
    }

    pub async fn user_posts(&self, user_id: &str, max_results: u8) -> Result<PostPage, XError> {
        let endpoint = XEndpoint::UserPosts { user_id: user_id.to_string(), max_results };
        Ok(self.api.execute(&endpoint).await?)
    }

    pub async fn mentions(&self, user_id: &str, max_results: u8) -> Result<PostPage, XError> {
        let endpoint = XEndpoint::Mentions { user_id: user_id.to_string(), max_results };
        Ok(self.api.execute(&endpoint).await?)
    }

    pub async fn search_recent(&self, query: &str, max_results: u8) -> Result<PostPage, XError> {
        if query.trim().is_empty() {
            return Err(ApiError::InvalidRequest("search query cannot be empty".into()).into());
        }
        let endpoint = XEndpoint::SearchRecent { query: query.to_string(), max_results };
        Ok(self.api.execute(&endpoint).await?)
    }

    /// Start a chunked media upload.
    pub async fn upload_media_init(
        &self,
        total_bytes: u64,
        media_type: &str,
        media_category: Option<&str>,
    ) -> Result<MediaUploadSession, XError> {
        if total_bytes == 0 {
            return Err(ApiError::InvalidRequest("media is empty".into()).into());
        }
        let endpoint = XEndpoint::MediaUploadInit {
            total_bytes,
            media_type: media_type.to_string(),
            media_category: media_category.map(str::to_string),
        };
        Ok(self.api.execute(&endpoint).await?)
    }

    pub async fn is_authenticated(&self) -> bool {
        match &self.account {
            XAccount::OAuth1(account) => account.is_configured().await,
            XAccount::OAuth2(service) => service.is_authenticated().await,
        }
    }

    /// Run the OAuth 2.0 PKCE flow with a user-entered client id.
    ///
    /// # Errors
    /// `Unsupported` under OAuth 1.0a, otherwise see
    /// [`AuthService::begin_authorization`]
    pub async fn begin_authorization(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<(), XError> {
        match &self.account {
            XAccount::OAuth1(_) => Err(AuthError::Unsupported("interactive authorization").into()),
            XAccount::OAuth2(service) => {
                Ok(service.begin_authorization(client_id, redirect_uri, scopes).await?)
            }
        }
    }

    /// Replace the OAuth 1.0a credential tuple.
    ///
    /// # Errors
    /// `Unsupported` under OAuth 2.0, otherwise see [`OAuth1Account::configure`]
    pub async fn configure_oauth1(&self, credentials: OAuth1Credentials) -> Result<(), XError> {
        match &self.account {
            XAccount::OAuth1(account) => Ok(account.configure(credentials).await?),
            XAccount::OAuth2(_) => Err(AuthError::Unsupported("OAuth 1.0a credentials").into()),
        }
    }

    /// Disconnect. Always succeeds locally.
    pub async fn logout(&self) {
        match &self.account {
            XAccount::OAuth1(account) => {
                account.clear().await;
                if let Err(e) = self.store.delete(SecretKey::Username).await {
                    warn!(error = %e, "Failed to delete stored username");
                }
            }
            XAccount::OAuth2(service) => service.logout().await,
        }
    }
}
