//! Mock implementations of the auth seams

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::auth::client::OAuthClientError;
use crate::auth::session::{AuthorizationError, AuthorizationSession};
use crate::auth::traits::OAuthClientTrait;
use crate::auth::types::{OAuthConfig, OAuthError, TokenSet};
use crate::security::{InMemorySecretStore, SecretKey, SecretStore, StorageError};

/// Token endpoint double that counts calls and mints numbered tokens.
///
/// Refreshes return `refreshed-N` / `refresh-N`, exchanges return
/// `exchanged-N` / `refresh-N`.
#[derive(Debug)]
pub struct MockOAuthClient {
    config: OAuthConfig,
    delay: Duration,
    lifetime_secs: i64,
    issued: AtomicUsize,
    exchange_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    revoke_calls: AtomicUsize,
    fail_exchange: AtomicBool,
    fail_refresh: AtomicBool,
    refresh_unreachable: AtomicBool,
    fail_revoke: AtomicBool,
    omit_refresh_token: AtomicBool,
}

impl MockOAuthClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: OAuthConfig {
                authorize_url: "https://mock.x.test/i/oauth2/authorize".to_string(),
                token_url: "https://mock.x.test/2/oauth2/token".to_string(),
                revoke_url: "https://mock.x.test/2/oauth2/revoke".to_string(),
                redirect_uri: "agentdodo://auth/callback".to_string(),
                callback_scheme: "agentdodo".to_string(),
                scopes: vec!["tweet.read".to_string(), "offline.access".to_string()],
            },
            delay: Duration::ZERO,
            lifetime_secs: 7200,
            issued: AtomicUsize::new(0),
            exchange_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            revoke_calls: AtomicUsize::new(0),
            fail_exchange: AtomicBool::new(false),
            fail_refresh: AtomicBool::new(false),
            refresh_unreachable: AtomicBool::new(false),
            fail_revoke: AtomicBool::new(false),
            omit_refresh_token: AtomicBool::new(false),
        }
    }

    /// Delay every endpoint call, widening race windows in concurrency tests.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Lifetime of issued access tokens in seconds.
    #[must_use]
    pub const fn with_lifetime(mut self, seconds: i64) -> Self {
        self.lifetime_secs = seconds;
        self
    }

    pub fn set_fail_exchange(&self, fail: bool) {
        self.fail_exchange.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::SeqCst);
    }

    /// Fail refreshes at the transport level instead of with a rejection.
    pub fn set_refresh_unreachable(&self, unreachable: bool) {
        self.refresh_unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn set_fail_revoke(&self, fail: bool) {
        self.fail_revoke.store(fail, Ordering::SeqCst);
    }

    /// Issue token sets without a refresh token.
    pub fn set_omit_refresh_token(&self, omit: bool) {
        self.omit_refresh_token.store(omit, Ordering::SeqCst);
    }

    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn revoke_calls(&self) -> usize {
        self.revoke_calls.load(Ordering::SeqCst)
    }

    fn mint(&self, prefix: &str) -> TokenSet {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let refresh_token =
            (!self.omit_refresh_token.load(Ordering::SeqCst)).then(|| format!("refresh-{n}"));
        TokenSet {
            access_token: format!("{prefix}-{n}"),
            refresh_token,
            token_type: "bearer".to_string(),
            expires_at: Utc::now() + chrono::Duration::seconds(self.lifetime_secs),
            scope: Some(self.config.scope_string()),
        }
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    fn rejected() -> OAuthClientError {
        OAuthClientError::OAuthError {
            status: 400,
            error: OAuthError {
                error: "invalid_grant".to_string(),
                error_description: Some("mock rejection".to_string()),
            },
        }
    }
}

impl Default for MockOAuthClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OAuthClientTrait for MockOAuthClient {
    fn config(&self) -> &OAuthConfig {
        &self.config
    }

    async fn exchange_code_for_tokens(
        &self,
        _client_id: &str,
        _code: &str,
        _code_verifier: &str,
        _redirect_uri: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_exchange.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        Ok(self.mint("exchanged"))
    }

    async fn refresh_access_token(
        &self,
        _client_id: &str,
        _refresh_token: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        if self.refresh_unreachable.load(Ordering::SeqCst) {
            return Err(OAuthClientError::RequestFailed("mock network down".to_string()));
        }
        Ok(self.mint("refreshed"))
    }

    async fn revoke_token(&self, _client_id: &str, _token: &str) -> Result<(), OAuthClientError> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(OAuthClientError::RequestFailed("mock network down".to_string()));
        }
        Ok(())
    }
}

enum SessionScript {
    Approve { code: String },
    Callback(Option<String>),
    Fail(AuthorizationError),
}

/// Authorization session double.
///
/// Records every URL it is asked to present.
pub struct MockAuthorizationSession {
    script: SessionScript,
    presented: Mutex<Vec<String>>,
}

impl MockAuthorizationSession {
    /// Redirect back with `code` and the `state` taken from the authorize URL.
    pub fn approving(code: impl Into<String>) -> Self {
        Self::with_script(SessionScript::Approve { code: code.into() })
    }

    /// Return a fixed callback URL, or none at all.
    #[must_use]
    pub fn returning(callback_url: Option<String>) -> Self {
        Self::with_script(SessionScript::Callback(callback_url))
    }

    #[must_use]
    pub fn cancelling() -> Self {
        Self::with_script(SessionScript::Fail(AuthorizationError::Cancelled))
    }

    #[must_use]
    pub fn failing(error: AuthorizationError) -> Self {
        Self::with_script(SessionScript::Fail(error))
    }

    fn with_script(script: SessionScript) -> Self {
        Self { script, presented: Mutex::new(Vec::new()) }
    }

    pub async fn presented_urls(&self) -> Vec<String> {
        self.presented.lock().await.clone()
    }
}

#[async_trait]
impl AuthorizationSession for MockAuthorizationSession {
    async fn present(
        &self,
        authorization_url: &str,
        callback_scheme: &str,
    ) -> Result<Option<String>, AuthorizationError> {
        self.presented.lock().await.push(authorization_url.to_string());
        match &self.script {
            SessionScript::Approve { code } => {
                let state = url::Url::parse(authorization_url)
                    .ok()
                    .and_then(|u| {
                        u.query_pairs().find(|(k, _)| k == "state").map(|(_, v)| v.into_owned())
                    })
                    .unwrap_or_default();
                Ok(Some(format!("{callback_scheme}://auth/callback?state={state}&code={code}")))
            }
            SessionScript::Callback(url) => Ok(url.clone()),
            SessionScript::Fail(error) => Err(error.clone()),
        }
    }
}

/// In-memory store whose operations can be made to fail per key.
#[derive(Debug, Default)]
pub struct FlakySecretStore {
    inner: InMemorySecretStore,
    failing_deletes: Mutex<HashSet<SecretKey>>,
    fail_saves: AtomicBool,
    saves_until_failure: AtomicUsize,
    fail_reads: AtomicBool,
}

impl FlakySecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_delete_of(&self, key: SecretKey) {
        self.failing_deletes.lock().await.insert(key);
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Fail only the `n`th save from now (1-based). Later saves succeed.
    pub fn fail_nth_save(&self, n: usize) {
        self.saves_until_failure.store(n, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Read through to the backing store, ignoring injected failures.
    pub async fn peek(&self, key: SecretKey) -> Option<String> {
        self.inner.retrieve(key).await.ok().flatten()
    }
}

#[async_trait]
impl SecretStore for FlakySecretStore {
    async fn save(&self, key: SecretKey, value: &str) -> Result<(), StorageError> {
        let countdown = self.saves_until_failure.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |left| left.checked_sub(1),
        );
        if self.fail_saves.load(Ordering::SeqCst) || countdown == Ok(1) {
            return Err(StorageError::AccessFailed(format!("injected save failure for {key}")));
        }
        self.inner.save(key, value).await
    }

    async fn retrieve(&self, key: SecretKey) -> Result<Option<String>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::AccessFailed(format!("injected read failure for {key}")));
        }
        self.inner.retrieve(key).await
    }

    async fn delete(&self, key: SecretKey) -> Result<(), StorageError> {
        if self.failing_deletes.lock().await.contains(&key) {
            return Err(StorageError::AccessFailed(format!("injected delete failure for {key}")));
        }
        self.inner.delete(key).await
    }
}
