//! Authentication core for the X API
//!
//! Two schemes, selected once when the API client is built:
//!
//! - **OAuth 1.0a**: a fixed credential tuple signs every request
//!   (HMAC-SHA1). No expiry, no refresh.
//! - **OAuth 2.0 + PKCE**: the user authorizes in a browser; the resulting
//!   access token is refreshed on expiry and after a 401.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   AuthService   │  begin_authorization / logout / is_authenticated
//! └────────┬────────┘
//!          │
//!          ├──► AuthorizationSession  (browser, supplied by the host app)
//!          ├──► PKCE utilities        (verifier, challenge, authorize URL)
//!          └──► TokenManager          (serialized load / refresh)
//!                    │
//!                    ├──► OAuthClient   (token endpoint HTTP)
//!                    └──► SecretStore   (keychain or in-memory)
//!
//! ┌─────────────────┐
//! │  OAuth1Account  │──► SecretStore
//! └────────┬────────┘
//!          └──► OAuth1Signer          (Authorization: OAuth ...)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use agentdodo_common::auth::{
//!     AuthService, AuthorizationError, AuthorizationSession, OAuthClient, OAuthConfig,
//!     TokenManager,
//! };
//! use agentdodo_common::security::InMemorySecretStore;
//!
//! struct Browser;
//!
//! #[async_trait::async_trait]
//! impl AuthorizationSession for Browser {
//!     async fn present(
//!         &self,
//!         _url: &str,
//!         _scheme: &str,
//!     ) -> Result<Option<String>, AuthorizationError> {
//!         Err(AuthorizationError::Cancelled)
//!     }
//! }
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OAuthConfig {
//!     authorize_url: "https://twitter.com/i/oauth2/authorize".into(),
//!     token_url: "https://api.twitter.com/2/oauth2/token".into(),
//!     revoke_url: "https://api.twitter.com/2/oauth2/revoke".into(),
//!     redirect_uri: "agentdodo://auth/callback".into(),
//!     callback_scheme: "agentdodo".into(),
//!     scopes: vec![
//!         "tweet.read".into(),
//!         "tweet.write".into(),
//!         "users.read".into(),
//!         "offline.access".into(),
//!     ],
//! };
//! let client = Arc::new(OAuthClient::new(config)?);
//! let store = Arc::new(InMemorySecretStore::new());
//! let tokens = Arc::new(TokenManager::new(client, store, None, 60));
//! let service = AuthService::new(tokens, Arc::new(Browser));
//!
//! match service.begin_authorization("client-id", "agentdodo://auth/callback", &[]).await {
//!     Err(e) if e.is_cancelled() => {} // user closed the window
//!     other => other?,
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod oauth1;
pub mod oauth1_account;
pub mod pkce;
pub mod service;
pub mod session;
pub mod token_manager;
pub mod traits;
pub mod types;

// Re-export commonly used types and functions
pub use client::{OAuthClient, OAuthClientError};
pub use error::AuthError;
pub use oauth1::{OAuth1Signer, SignatureError, SignedRequest};
pub use oauth1_account::OAuth1Account;
pub use pkce::{
    build_authorization_url, generate_code_challenge, generate_code_verifier, generate_pkce,
    generate_state, validate_state, verify_code_challenge, AuthorizationRequest, PkceCredentials,
};
pub use service::AuthService;
pub use session::{parse_callback, AuthorizationError, AuthorizationSession};
pub use token_manager::{AuthPhase, PhaseGuard, TokenManager, TokenManagerError};
pub use traits::OAuthClientTrait;
pub use types::{ClientId, OAuth1Credentials, OAuthConfig, OAuthError, TokenResponse, TokenSet};
