//! OAuth 1.0a credential tuple lifecycle
//!
//! No expiry and no refresh: the tuple is either fully present or the account
//! is not configured. Reconfiguring replaces all four fields.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use super::error::AuthError;
use super::oauth1::OAuth1Signer;
use super::types::OAuth1Credentials;
use crate::security::{replace_entries, SecretKey, SecretStore};

/// Persisted OAuth 1.0a credentials with an in-memory copy.
pub struct OAuth1Account<S: SecretStore> {
    store: Arc<S>,
    credentials: Mutex<Option<OAuth1Credentials>>,
}

impl<S: SecretStore> OAuth1Account<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store, credentials: Mutex::new(None) }
    }

    /// Persist a complete tuple and make it current.
    ///
    /// # Errors
    /// `NotConfigured` for an incomplete tuple, `Storage` if a write fails
    /// (the previous tuple stays current, in memory and in the store).
    pub async fn configure(&self, credentials: OAuth1Credentials) -> Result<(), AuthError> {
        if !credentials.is_complete() {
            return Err(AuthError::NotConfigured(
                "all four OAuth 1.0a fields are required".to_string(),
            ));
        }

        let mut current = self.credentials.lock().await;
        let entries = [
            (SecretKey::ApiKey, Some(credentials.consumer_key.as_str())),
            (SecretKey::ApiSecret, Some(credentials.consumer_secret.as_str())),
            (SecretKey::OAuth1AccessToken, Some(credentials.access_token.as_str())),
            (SecretKey::AccessTokenSecret, Some(credentials.access_token_secret.as_str())),
        ];
        replace_entries(self.store.as_ref(), &entries).await?;
        *current = Some(credentials);

        info!("OAuth 1.0a credentials configured");
        Ok(())
    }

    /// Read the tuple from the secret store. Returns whether it is complete.
    ///
    /// # Errors
    /// Returns error if the secret store cannot be read
    pub async fn load(&self) -> Result<bool, AuthError> {
        let mut current = self.credentials.lock().await;
        *current = self.read_stored().await?;
        Ok(current.is_some())
    }

    /// Whether a complete tuple is cached or stored. Unreadable storage
    /// counts as not configured.
    pub async fn is_configured(&self) -> bool {
        match self.current().await {
            Ok(credentials) => credentials.is_some(),
            Err(e) => {
                warn!(error = %e, "Could not read OAuth 1.0a credentials");
                false
            }
        }
    }

    /// Signer over the current tuple, loading it from the store on first use.
    ///
    /// # Errors
    /// `NotConfigured` when no complete tuple exists, `Storage` if the store
    /// cannot be read
    pub async fn signer(&self) -> Result<OAuth1Signer, AuthError> {
        let credentials = self
            .current()
            .await?
            .ok_or_else(|| AuthError::NotConfigured("OAuth 1.0a credentials missing".to_string()))?;
        Ok(OAuth1Signer::new(credentials)?)
    }

    async fn current(&self) -> Result<Option<OAuth1Credentials>, AuthError> {
        let mut current = self.credentials.lock().await;
        if current.is_none() {
            *current = self.read_stored().await?;
        }
        Ok(current.clone())
    }

    async fn read_stored(&self) -> Result<Option<OAuth1Credentials>, AuthError> {
        Ok(OAuth1Credentials::from_parts(
            self.store.retrieve(SecretKey::ApiKey).await?,
            self.store.retrieve(SecretKey::ApiSecret).await?,
            self.store.retrieve(SecretKey::OAuth1AccessToken).await?,
            self.store.retrieve(SecretKey::AccessTokenSecret).await?,
        ))
    }

    /// Delete the persisted tuple and forget it. Never fails.
    pub async fn clear(&self) {
        let mut current = self.credentials.lock().await;
        for key in SecretKey::OAUTH1 {
            if let Err(e) = self.store.delete(key).await {
                warn!(key = %key, error = %e, "Failed to delete OAuth 1.0a secret");
            }
        }
        *current = None;
        info!("OAuth 1.0a credentials cleared");
    }
}
