//! OAuth 2.0 token lifecycle
//!
//! Owns the in-memory token triple and decides when it has to be reloaded or
//! refreshed:
//! - Cached token, if it is not about to expire
//! - Otherwise the persisted token (covers process restarts)
//! - Otherwise exactly one refresh with the persisted refresh token
//!
//! Every read and refresh runs under one async mutex. Concurrent callers
//! queue behind an in-flight load or refresh and reuse its result.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::client::OAuthClientError;
use super::traits::OAuthClientTrait;
use super::types::{ClientId, TokenSet};
use crate::security::{replace_entries, SecretKey, SecretStore, StorageError};

/// Upper bound on the refresh skew. Larger values are capped.
pub const MAX_REFRESH_SKEW_SECS: u64 = 3600;

/// Entries that make up the persisted token triple.
const TOKEN_KEYS: [SecretKey; 3] =
    [SecretKey::AccessToken, SecretKey::RefreshToken, SecretKey::TokenExpiresAt];

/// Error type for token manager operations
#[derive(Debug, Error)]
pub enum TokenManagerError {
    /// Nothing stored: the user never authorized (or logged out)
    #[error("not authenticated")]
    NotAuthenticated,

    /// No OAuth 2.0 client id is configured or built in
    #[error("no OAuth client id configured")]
    MissingClientId,

    /// The access token expired and there is no refresh token
    #[error("access token expired and no refresh token is available")]
    NoRefreshToken,

    /// The refresh call was rejected or failed
    #[error("token refresh failed: {0}")]
    RefreshFailed(#[source] OAuthClientError),

    /// The authorization code exchange failed
    #[error("authorization code exchange failed: {0}")]
    ExchangeFailed(#[source] OAuthClientError),

    /// Secret store read failed
    #[error("secret store error: {0}")]
    Storage(#[from] StorageError),
}

impl TokenManagerError {
    /// Whether the user has to run the interactive authorization again.
    #[must_use]
    pub const fn requires_authorization(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

/// Where the OAuth 2.0 credential currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Unconfigured,
    /// Interactive authorization in progress
    Configuring,
    Valid,
    Expired,
    Refreshing,
}

#[derive(Default)]
struct TokenState {
    tokens: Option<TokenSet>,
}

/// Restores the previous phase when an authorization attempt does not finish.
///
/// Dropping it without calling [`PhaseGuard::commit`] (an error path or a
/// cancelled future) puts the phase back to what it was before.
#[must_use = "dropping the guard immediately restores the previous phase"]
pub struct PhaseGuard<'a> {
    phase: &'a watch::Sender<AuthPhase>,
    previous: AuthPhase,
    armed: bool,
}

impl PhaseGuard<'_> {
    #[must_use]
    pub const fn previous(&self) -> AuthPhase {
        self.previous
    }

    pub fn commit(mut self) {
        self.armed = false;
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!(restored = ?self.previous, "Authorization did not complete, restoring phase");
            self.phase.send_replace(self.previous);
        }
    }
}

/// Token lifecycle manager
///
/// # Type Parameters
/// * `C` - Token endpoint client (implements `OAuthClientTrait`)
/// * `S` - Secret store (implements `SecretStore`)
pub struct TokenManager<C: OAuthClientTrait, S: SecretStore> {
    oauth_client: Arc<C>,
    store: Arc<S>,
    built_in_client_id: Option<String>,
    refresh_skew: Duration,
    state: Mutex<TokenState>,
    phase: watch::Sender<AuthPhase>,
}

impl<C: OAuthClientTrait, S: SecretStore> TokenManager<C, S> {
    /// # Arguments
    /// * `built_in_client_id` - Application's own client id, used only when
    ///   the user has not configured one
    /// * `refresh_skew_secs` - Tokens expiring within this many seconds are
    ///   treated as expired (at most [`MAX_REFRESH_SKEW_SECS`])
    pub fn new(
        oauth_client: Arc<C>,
        store: Arc<S>,
        built_in_client_id: Option<String>,
        refresh_skew_secs: u64,
    ) -> Self {
        let (phase, _) = watch::channel(AuthPhase::Unconfigured);
        Self {
            oauth_client,
            store,
            built_in_client_id,
            refresh_skew: Duration::seconds(
                i64::try_from(refresh_skew_secs.min(MAX_REFRESH_SKEW_SECS)).unwrap_or(0),
            ),
            state: Mutex::new(TokenState::default()),
            phase,
        }
    }

    pub fn oauth_client(&self) -> &C {
        &self.oauth_client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        *self.phase.borrow()
    }

    /// Observe phase transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthPhase> {
        self.phase.subscribe()
    }

    /// Load persisted tokens into memory without refreshing.
    ///
    /// # Errors
    /// Returns error if the secret store cannot be read
    pub async fn initialize(&self) -> Result<(), TokenManagerError> {
        let mut state = self.state.lock().await;
        match self.load_persisted().await? {
            Some(tokens) => {
                let expired = tokens.is_expired(self.refresh_skew);
                info!(expired, "Loaded persisted OAuth 2.0 tokens");
                state.tokens = Some(tokens);
                self.set_phase(if expired { AuthPhase::Expired } else { AuthPhase::Valid });
            }
            None => {
                debug!("No persisted OAuth 2.0 tokens");
                self.set_phase(AuthPhase::Unconfigured);
            }
        }
        Ok(())
    }

    /// Return an access token that is not expired, loading or refreshing as
    /// needed.
    ///
    /// # Errors
    /// - `NotAuthenticated` if nothing was ever stored
    /// - `NoRefreshToken` / `RefreshFailed` if the token expired and could not
    ///   be renewed
    pub async fn get_valid_access_token(&self) -> Result<String, TokenManagerError> {
        let mut state = self.state.lock().await;

        if let Some(tokens) = state.tokens.as_ref() {
            if !tokens.is_expired(self.refresh_skew) {
                return Ok(tokens.access_token.clone());
            }
        }

        if let Some(persisted) = self.load_persisted().await? {
            if !persisted.is_expired(self.refresh_skew) {
                debug!("Using persisted access token");
                let access_token = persisted.access_token.clone();
                state.tokens = Some(persisted);
                self.set_phase(AuthPhase::Valid);
                return Ok(access_token);
            }
            state.tokens = Some(persisted);
        }

        if state.tokens.is_none() {
            self.set_phase(AuthPhase::Unconfigured);
            return Err(TokenManagerError::NotAuthenticated);
        }

        self.set_phase(AuthPhase::Expired);
        self.refresh_locked(&mut state).await
    }

    /// Refresh after the API rejected `rejected_token` with a 401.
    ///
    /// If another caller already replaced that token, the replacement is
    /// returned without another refresh.
    ///
    /// # Errors
    /// Same as [`get_valid_access_token`](Self::get_valid_access_token)
    pub async fn refresh_rejected(
        &self,
        rejected_token: &str,
    ) -> Result<String, TokenManagerError> {
        let mut state = self.state.lock().await;

        if state.tokens.is_none() {
            let Some(persisted) = self.load_persisted().await? else {
                self.set_phase(AuthPhase::Unconfigured);
                return Err(TokenManagerError::NotAuthenticated);
            };
            state.tokens = Some(persisted);
        }

        if let Some(tokens) = state.tokens.as_ref() {
            if tokens.access_token != rejected_token && !tokens.is_expired(self.refresh_skew) {
                debug!("Rejected token already replaced, reusing current token");
                return Ok(tokens.access_token.clone());
            }
        }

        self.set_phase(AuthPhase::Expired);
        self.refresh_locked(&mut state).await
    }

    /// Caller must hold the state lock.
    async fn refresh_locked(&self, state: &mut TokenState) -> Result<String, TokenManagerError> {
        let refresh_token = match state.tokens.as_ref().and_then(|t| t.refresh_token.clone()) {
            Some(token) => token,
            None => match self.store.retrieve(SecretKey::RefreshToken).await? {
                Some(token) => token,
                None => {
                    warn!("Access token expired and no refresh token is stored");
                    self.discard_tokens(state).await;
                    return Err(TokenManagerError::NoRefreshToken);
                }
            },
        };

        let Some(client_id) = self.resolve_client_id().await? else {
            warn!("Cannot refresh without an OAuth client id");
            self.invalidate(state);
            return Err(TokenManagerError::MissingClientId);
        };

        self.set_phase(AuthPhase::Refreshing);
        info!(built_in_client = !client_id.is_configured(), "Refreshing access token");

        match self.oauth_client.refresh_access_token(client_id.as_str(), &refresh_token).await {
            Ok(mut tokens) => {
                if tokens.refresh_token.is_none() {
                    tokens.refresh_token = Some(refresh_token);
                }
                if let Err(e) = self.persist(&tokens).await {
                    warn!(error = %e, "Refreshed tokens could not be persisted");
                }
                let access_token = tokens.access_token.clone();
                state.tokens = Some(tokens);
                self.set_phase(AuthPhase::Valid);
                info!("Successfully refreshed access token");
                Ok(access_token)
            }
            Err(e) if e.is_rejection() => {
                warn!(error = %e, "Refresh token rejected, discarding stored tokens");
                self.discard_tokens(state).await;
                Err(TokenManagerError::RefreshFailed(e))
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                self.invalidate(state);
                Err(TokenManagerError::RefreshFailed(e))
            }
        }
    }

    /// Mark the authorization flow as started. See [`PhaseGuard`].
    pub fn begin_configuring(&self) -> PhaseGuard<'_> {
        let previous = self.phase.send_replace(AuthPhase::Configuring);
        PhaseGuard { phase: &self.phase, previous, armed: true }
    }

    /// Exchange an authorization code and install the resulting tokens.
    ///
    /// A `ClientId::Configured` id is persisted; a built-in id never is.
    ///
    /// # Errors
    /// `ExchangeFailed` if the provider rejects the code, `Storage` if the
    /// tokens cannot be persisted
    pub async fn complete_authorization(
        &self,
        client_id: &ClientId,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenSet, TokenManagerError> {
        let mut state = self.state.lock().await;

        let tokens = self
            .oauth_client
            .exchange_code_for_tokens(client_id.as_str(), code, code_verifier, redirect_uri)
            .await
            .map_err(TokenManagerError::ExchangeFailed)?;

        if let ClientId::Configured(id) = client_id {
            self.store.save(SecretKey::ClientId, id).await?;
        }
        self.persist(&tokens).await?;

        state.tokens = Some(tokens.clone());
        self.set_phase(AuthPhase::Valid);
        info!("Authorization completed");
        Ok(tokens)
    }

    /// Install a token set directly (persisted and cached).
    ///
    /// # Errors
    /// Returns error if the secret store write fails
    pub async fn store_tokens(&self, tokens: TokenSet) -> Result<(), TokenManagerError> {
        let mut state = self.state.lock().await;
        self.persist(&tokens).await?;
        let expired = tokens.is_expired(self.refresh_skew);
        state.tokens = Some(tokens);
        self.set_phase(if expired { AuthPhase::Expired } else { AuthPhase::Valid });
        Ok(())
    }

    /// Revoke (best-effort), delete persisted entries, clear memory.
    ///
    /// Never fails: storage errors are logged and the in-memory state is
    /// cleared regardless.
    pub async fn logout(&self) {
        let mut state = self.state.lock().await;

        let access_token = match state.tokens.as_ref() {
            Some(tokens) => Some(tokens.access_token.clone()),
            None => self.store.retrieve(SecretKey::AccessToken).await.ok().flatten(),
        };
        if let Some(token) = access_token {
            match self.resolve_client_id().await.ok().flatten() {
                Some(client_id) => {
                    let revoked = self.oauth_client.revoke_token(client_id.as_str(), &token).await;
                    if let Err(e) = revoked {
                        warn!(error = %e, "Token revocation failed, continuing logout");
                    }
                }
                None => debug!("No client id available, skipping revocation"),
            }
        }

        for key in SecretKey::OAUTH2 {
            if let Err(e) = self.store.delete(key).await {
                warn!(key = %key, error = %e, "Failed to delete secret during logout");
            }
        }

        state.tokens = None;
        self.set_phase(AuthPhase::Unconfigured);
        info!("Logged out");
    }

    /// Whether a token (possibly expired but refreshable) is available.
    pub async fn is_authenticated(&self) -> bool {
        let state = self.state.lock().await;
        if state.tokens.is_some() {
            return true;
        }
        matches!(self.store.retrieve(SecretKey::AccessToken).await, Ok(Some(_)))
    }

    /// Seconds until the cached access token expires.
    pub async fn seconds_until_expiry(&self) -> Option<i64> {
        self.state.lock().await.tokens.as_ref().map(TokenSet::seconds_until_expiry)
    }

    /// Configured client id if stored, otherwise the built-in one.
    ///
    /// # Errors
    /// Returns error if the secret store cannot be read
    pub async fn resolve_client_id(&self) -> Result<Option<ClientId>, TokenManagerError> {
        let configured = self.store.retrieve(SecretKey::ClientId).await?;
        Ok(ClientId::resolve(configured, self.built_in_client_id.as_deref()))
    }

    fn invalidate(&self, state: &mut TokenState) {
        state.tokens = None;
        self.set_phase(AuthPhase::Unconfigured);
    }

    /// Drop a token triple that can no longer be refreshed. The client id
    /// and username survive.
    async fn discard_tokens(&self, state: &mut TokenState) {
        for key in TOKEN_KEYS {
            if let Err(e) = self.store.delete(key).await {
                warn!(key = %key, error = %e, "Failed to delete dead token");
            }
        }
        self.invalidate(state);
    }

    fn set_phase(&self, phase: AuthPhase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            debug!(from = ?previous, to = ?phase, "Auth phase changed");
        }
    }

    async fn load_persisted(&self) -> Result<Option<TokenSet>, TokenManagerError> {
        let Some(access_token) = self.store.retrieve(SecretKey::AccessToken).await? else {
            return Ok(None);
        };
        let refresh_token = self.store.retrieve(SecretKey::RefreshToken).await?;
        // Entries without a readable expiry are treated as expired.
        let expires_at = self
            .store
            .retrieve(SecretKey::TokenExpiresAt)
            .await?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map_or(DateTime::<Utc>::UNIX_EPOCH, |t| t.with_timezone(&Utc));

        Ok(Some(TokenSet {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_at,
            scope: None,
        }))
    }

    /// Persist the whole triple or, on failure, leave the previous one.
    async fn persist(&self, tokens: &TokenSet) -> Result<(), StorageError> {
        let expires_at = tokens.expires_at.to_rfc3339();
        let entries = [
            (SecretKey::AccessToken, Some(tokens.access_token.as_str())),
            (SecretKey::RefreshToken, tokens.refresh_token.as_deref()),
            (SecretKey::TokenExpiresAt, Some(expires_at.as_str())),
        ];
        replace_entries(self.store.as_ref(), &entries).await
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::token_manager.
    use std::time::Duration as StdDuration;

    use futures::future::join_all;

    use super::*;
    use crate::security::InMemorySecretStore;
    use crate::testing::{FlakySecretStore, MockOAuthClient};

    type Manager = TokenManager<MockOAuthClient, InMemorySecretStore>;

    fn manager_with(
        client: MockOAuthClient,
    ) -> (Arc<Manager>, Arc<MockOAuthClient>, Arc<InMemorySecretStore>) {
        let client = Arc::new(client);
        let store = Arc::new(InMemorySecretStore::new());
        let manager = Arc::new(TokenManager::new(
            Arc::clone(&client),
            Arc::clone(&store),
            Some("built-in-client".to_string()),
            60,
        ));
        (manager, client, store)
    }

    fn tokens(access: &str, refresh: Option<&str>, expires_in_secs: i64) -> TokenSet {
        TokenSet {
            access_token: access.to_string(),
            refresh_token: refresh.map(str::to_string),
            token_type: "bearer".to_string(),
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
            scope: None,
        }
    }

    async fn stored(store: &InMemorySecretStore, key: SecretKey) -> Option<String> {
        store.retrieve(key).await.unwrap()
    }

    async fn seed_store(store: &InMemorySecretStore, tokens: &TokenSet) {
        store.save(SecretKey::AccessToken, &tokens.access_token).await.unwrap();
        if let Some(refresh) = &tokens.refresh_token {
            store.save(SecretKey::RefreshToken, refresh).await.unwrap();
        }
        store.save(SecretKey::TokenExpiresAt, &tokens.expires_at.to_rfc3339()).await.unwrap();
    }

    /// Validates the cold-start path.
    ///
    /// Assertions:
    /// - Ensures a fresh manager without stored tokens is unauthenticated.
    /// - Ensures `get_valid_access_token` fails with `NotAuthenticated`.
    #[tokio::test]
    async fn empty_store_is_not_authenticated() {
        let (manager, client, _) = manager_with(MockOAuthClient::new());
        assert!(!manager.is_authenticated().await);
        assert!(matches!(
            manager.get_valid_access_token().await,
            Err(TokenManagerError::NotAuthenticated)
        ));
        assert_eq!(client.refresh_calls(), 0);
        assert_eq!(manager.phase(), AuthPhase::Unconfigured);
    }

    /// Validates that an unexpired persisted token is used without refresh.
    ///
    /// Assertions:
    /// - Ensures the persisted access token is returned.
    /// - Ensures no refresh call was made.
    #[tokio::test]
    async fn loads_unexpired_persisted_token() {
        let (manager, client, store) = manager_with(MockOAuthClient::new());
        seed_store(&store, &tokens("persisted", Some("rt"), 3600)).await;

        assert_eq!(manager.get_valid_access_token().await.unwrap(), "persisted");
        assert_eq!(client.refresh_calls(), 0);
        assert_eq!(manager.phase(), AuthPhase::Valid);
    }

    /// Validates that an expired token is never returned without a refresh.
    ///
    /// Assertions:
    /// - Ensures the returned token is the refreshed one.
    /// - Ensures exactly one refresh happened and the result was persisted.
    #[tokio::test]
    async fn expired_token_is_refreshed_and_persisted() {
        let (manager, client, store) = manager_with(MockOAuthClient::new());
        seed_store(&store, &tokens("stale", Some("rt"), -10)).await;

        let token = manager.get_valid_access_token().await.unwrap();
        assert_eq!(token, "refreshed-1");
        assert_eq!(client.refresh_calls(), 1);
        assert_eq!(stored(&store, SecretKey::AccessToken).await.as_deref(), Some("refreshed-1"));
        assert_eq!(stored(&store, SecretKey::RefreshToken).await.as_deref(), Some("refresh-1"));
        assert_eq!(manager.phase(), AuthPhase::Valid);
    }

    #[tokio::test]
    async fn token_inside_refresh_skew_is_refreshed() {
        let (manager, client, _) = manager_with(MockOAuthClient::new());
        manager.store_tokens(tokens("about-to-expire", Some("rt"), 30)).await.unwrap();

        assert_eq!(manager.get_valid_access_token().await.unwrap(), "refreshed-1");
        assert_eq!(client.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn persisted_token_without_expiry_is_refreshed() {
        let (manager, client, store) = manager_with(MockOAuthClient::new());
        store.save(SecretKey::AccessToken, "legacy").await.unwrap();
        store.save(SecretKey::RefreshToken, "rt").await.unwrap();

        assert_eq!(manager.get_valid_access_token().await.unwrap(), "refreshed-1");
        assert_eq!(client.refresh_calls(), 1);
    }

    /// Validates the concurrency invariant.
    ///
    /// Assertions:
    /// - Ensures 16 concurrent callers trigger exactly one refresh.
    /// - Ensures every caller receives the same token.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_refresh() {
        let (manager, client, store) =
            manager_with(MockOAuthClient::new().with_delay(StdDuration::from_millis(50)));
        seed_store(&store, &tokens("stale", Some("rt"), -10)).await;

        let calls = (0..16).map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.get_valid_access_token().await })
        });
        let results: Vec<String> =
            join_all(calls).await.into_iter().map(|r| r.unwrap().unwrap()).collect();

        assert_eq!(client.refresh_calls(), 1);
        assert!(results.iter().all(|t| t == "refreshed-1"));
    }

    #[tokio::test]
    async fn missing_refresh_token_surfaces_and_resets_phase() {
        let (manager, client, store) = manager_with(MockOAuthClient::new());
        seed_store(&store, &tokens("stale", None, -10)).await;

        assert!(matches!(
            manager.get_valid_access_token().await,
            Err(TokenManagerError::NoRefreshToken)
        ));
        assert_eq!(client.refresh_calls(), 0);
        assert_eq!(manager.phase(), AuthPhase::Unconfigured);
        assert!(!manager.is_authenticated().await);
        assert!(store.retrieve(SecretKey::AccessToken).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_refresh_surfaces_and_resets_phase() {
        let (manager, client, store) = manager_with(MockOAuthClient::new());
        client.set_fail_refresh(true);
        seed_store(&store, &tokens("stale", Some("rt"), -10)).await;

        let err = manager.get_valid_access_token().await.unwrap_err();
        assert!(matches!(err, TokenManagerError::RefreshFailed(_)));
        assert!(err.requires_authorization());
        assert_eq!(manager.phase(), AuthPhase::Unconfigured);
    }

    /// Validates that a refused refresh token is not retried forever.
    ///
    /// Assertions:
    /// - Ensures the dead triple is deleted while the client id survives.
    /// - Ensures later calls fail with `NotAuthenticated` and no new refresh.
    #[tokio::test]
    async fn rejected_refresh_discards_dead_tokens() {
        let (manager, client, store) = manager_with(MockOAuthClient::new());
        client.set_fail_refresh(true);
        store.save(SecretKey::ClientId, "mine").await.unwrap();
        seed_store(&store, &tokens("stale", Some("revoked"), -10)).await;

        let err = manager.get_valid_access_token().await.unwrap_err();
        assert!(matches!(err, TokenManagerError::RefreshFailed(_)));
        assert!(!manager.is_authenticated().await);
        for key in TOKEN_KEYS {
            assert!(store.retrieve(key).await.unwrap().is_none(), "{key} still stored");
        }
        assert_eq!(store.retrieve(SecretKey::ClientId).await.unwrap().as_deref(), Some("mine"));

        for _ in 0..3 {
            assert!(matches!(
                manager.get_valid_access_token().await,
                Err(TokenManagerError::NotAuthenticated)
            ));
        }
        assert_eq!(client.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn unreachable_token_endpoint_keeps_tokens_for_retry() {
        let (manager, client, store) = manager_with(MockOAuthClient::new());
        client.set_refresh_unreachable(true);
        seed_store(&store, &tokens("stale", Some("rt"), -10)).await;

        let err = manager.get_valid_access_token().await.unwrap_err();
        assert!(matches!(
            err,
            TokenManagerError::RefreshFailed(OAuthClientError::RequestFailed(_))
        ));
        assert!(manager.is_authenticated().await);
        assert_eq!(store.retrieve(SecretKey::RefreshToken).await.unwrap().as_deref(), Some("rt"));

        client.set_refresh_unreachable(false);
        assert_eq!(manager.get_valid_access_token().await.unwrap(), "refreshed-1");
        assert_eq!(client.refresh_calls(), 2);
    }

    /// Validates that a failed write never leaves a mixed token triple.
    ///
    /// Assertions:
    /// - Ensures `store_tokens` reports the storage error.
    /// - Ensures the previously persisted triple is still intact.
    #[tokio::test]
    async fn failed_persist_keeps_previous_triple() {
        let client = Arc::new(MockOAuthClient::new());
        let store = Arc::new(FlakySecretStore::new());
        let manager = TokenManager::new(Arc::clone(&client), Arc::clone(&store), None, 60);
        let first = tokens("at-1", Some("rt-1"), 3600);
        manager.store_tokens(first.clone()).await.unwrap();

        store.fail_nth_save(2);
        let err = manager.store_tokens(tokens("at-2", Some("rt-2"), 3600)).await.unwrap_err();
        assert!(matches!(err, TokenManagerError::Storage(_)));

        assert_eq!(store.peek(SecretKey::AccessToken).await.as_deref(), Some("at-1"));
        assert_eq!(store.peek(SecretKey::RefreshToken).await.as_deref(), Some("rt-1"));
        assert_eq!(
            store.peek(SecretKey::TokenExpiresAt).await,
            Some(first.expires_at.to_rfc3339())
        );
    }

    #[tokio::test]
    async fn oversized_refresh_skew_is_capped() {
        let client = Arc::new(MockOAuthClient::new());
        let store = Arc::new(InMemorySecretStore::new());
        let manager = TokenManager::new(Arc::clone(&client), store, None, u64::MAX);
        manager.store_tokens(tokens("two-hours", Some("rt"), 7200)).await.unwrap();

        assert_eq!(manager.get_valid_access_token().await.unwrap(), "two-hours");
        assert_eq!(client.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn refresh_keeps_previous_refresh_token_when_none_returned() {
        let (manager, client, store) = manager_with(MockOAuthClient::new());
        client.set_omit_refresh_token(true);
        seed_store(&store, &tokens("stale", Some("original-rt"), -10)).await;

        manager.get_valid_access_token().await.unwrap();
        assert_eq!(stored(&store, SecretKey::RefreshToken).await.as_deref(), Some("original-rt"));
    }

    /// Validates that concurrent 401s collapse into one refresh.
    ///
    /// Assertions:
    /// - Ensures a second `refresh_rejected` with the same stale token reuses
    ///   the first refresh's result.
    #[tokio::test]
    async fn refresh_rejected_deduplicates() {
        let (manager, client, _) = manager_with(MockOAuthClient::new());
        manager.store_tokens(tokens("valid-but-revoked", Some("rt"), 3600)).await.unwrap();

        let first = manager.refresh_rejected("valid-but-revoked").await.unwrap();
        let second = manager.refresh_rejected("valid-but-revoked").await.unwrap();
        assert_eq!(first, "refreshed-1");
        assert_eq!(second, "refreshed-1");
        assert_eq!(client.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn refresh_uses_configured_client_id_when_stored() {
        let (manager, _, store) = manager_with(MockOAuthClient::new());
        assert_eq!(
            manager.resolve_client_id().await.unwrap(),
            Some(ClientId::BuiltIn("built-in-client".into()))
        );
        store.save(SecretKey::ClientId, "user-client").await.unwrap();
        assert_eq!(
            manager.resolve_client_id().await.unwrap(),
            Some(ClientId::Configured("user-client".into()))
        );
    }

    #[tokio::test]
    async fn built_in_client_id_is_never_persisted() {
        let (manager, _, store) = manager_with(MockOAuthClient::new());
        manager
            .complete_authorization(
                &ClientId::BuiltIn("built-in-client".into()),
                "code",
                "verifier",
                "cb://",
            )
            .await
            .unwrap();
        assert!(store.retrieve(SecretKey::ClientId).await.unwrap().is_none());

        manager
            .complete_authorization(
                &ClientId::Configured("mine".into()),
                "code",
                "verifier",
                "cb://",
            )
            .await
            .unwrap();
        assert_eq!(store.retrieve(SecretKey::ClientId).await.unwrap().as_deref(), Some("mine"));
    }

    /// Validates logout when the remote revoke fails.
    ///
    /// Assertions:
    /// - Ensures revoke was attempted.
    /// - Ensures every OAuth 2.0 key is gone and the manager is logged out.
    #[tokio::test]
    async fn logout_clears_everything_even_if_revoke_fails() {
        let (manager, client, store) = manager_with(MockOAuthClient::new());
        client.set_fail_revoke(true);
        manager.store_tokens(tokens("at", Some("rt"), 3600)).await.unwrap();
        store.save(SecretKey::ClientId, "mine").await.unwrap();
        store.save(SecretKey::Username, "dodo").await.unwrap();

        manager.logout().await;

        assert_eq!(client.revoke_calls(), 1);
        assert!(!manager.is_authenticated().await);
        for key in SecretKey::OAUTH2 {
            assert!(store.retrieve(key).await.unwrap().is_none(), "{key} still stored");
        }
        assert_eq!(manager.phase(), AuthPhase::Unconfigured);
    }

    #[tokio::test]
    async fn logout_clears_memory_when_a_delete_fails() {
        let client = Arc::new(MockOAuthClient::new());
        let store = Arc::new(FlakySecretStore::new());
        let manager = TokenManager::new(Arc::clone(&client), Arc::clone(&store), None, 60);
        manager.store_tokens(tokens("at", Some("rt"), 3600)).await.unwrap();
        store.fail_delete_of(SecretKey::RefreshToken).await;

        manager.logout().await;

        assert!(manager.seconds_until_expiry().await.is_none());
        assert!(store.peek(SecretKey::AccessToken).await.is_none());
        assert!(store.peek(SecretKey::TokenExpiresAt).await.is_none());
        assert_eq!(store.peek(SecretKey::RefreshToken).await.as_deref(), Some("rt"));
        assert_eq!(manager.phase(), AuthPhase::Unconfigured);
    }

    #[tokio::test]
    async fn phase_guard_restores_previous_phase() {
        let (manager, _, _) = manager_with(MockOAuthClient::new());
        manager.store_tokens(tokens("at", Some("rt"), 3600)).await.unwrap();
        assert_eq!(manager.phase(), AuthPhase::Valid);

        {
            let guard = manager.begin_configuring();
            assert_eq!(guard.previous(), AuthPhase::Valid);
            assert_eq!(manager.phase(), AuthPhase::Configuring);
        }
        assert_eq!(manager.phase(), AuthPhase::Valid);

        let guard = manager.begin_configuring();
        guard.commit();
        assert_eq!(manager.phase(), AuthPhase::Configuring);
    }

    #[tokio::test]
    async fn initialize_reports_expired_tokens() {
        let (manager, client, store) = manager_with(MockOAuthClient::new());
        seed_store(&store, &tokens("stale", Some("rt"), -10)).await;

        manager.initialize().await.unwrap();
        assert_eq!(manager.phase(), AuthPhase::Expired);
        assert!(manager.is_authenticated().await);
        assert_eq!(client.refresh_calls(), 0);
    }
}
