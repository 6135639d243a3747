//! The `SecretStore` contract and the keys stored through it

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// Errors raised by a secret store backend.
///
/// A missing entry is not an error: [`SecretStore::retrieve`] returns `None`.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("secret store access failed: {0}")]
    AccessFailed(String),

    #[error("secret store backend unavailable: {0}")]
    Unavailable(String),
}

/// Stable identifiers of every secret the client persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SecretKey {
    ClientId,
    ClientSecret,
    AccessToken,
    RefreshToken,
    /// RFC 3339 timestamp of the OAuth 2.0 access token expiry.
    TokenExpiresAt,
    Username,
    ApiKey,
    ApiSecret,
    OAuth1AccessToken,
    AccessTokenSecret,
}

impl SecretKey {
    /// Entries owned by the OAuth 2.0 session, all removed on logout.
    pub const OAUTH2: [Self; 6] = [
        Self::ClientId,
        Self::ClientSecret,
        Self::AccessToken,
        Self::RefreshToken,
        Self::TokenExpiresAt,
        Self::Username,
    ];

    /// Entries making up the OAuth 1.0a credential tuple.
    pub const OAUTH1: [Self; 4] =
        [Self::ApiKey, Self::ApiSecret, Self::OAuth1AccessToken, Self::AccessTokenSecret];

    /// The account name used in the backing store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClientId => "x_client_id",
            Self::ClientSecret => "x_client_secret",
            Self::AccessToken => "x_access_token",
            Self::RefreshToken => "x_refresh_token",
            Self::TokenExpiresAt => "x_token_expires_at",
            Self::Username => "x_username",
            Self::ApiKey => "x_api_key",
            Self::ApiSecret => "x_api_secret",
            Self::OAuth1AccessToken => "x_oauth1_access_token",
            Self::AccessTokenSecret => "x_access_token_secret",
        }
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable, access-controlled key/value storage for secrets.
///
/// Implementations must serialize their own mutations; callers share one
/// store behind an `Arc`.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Insert or replace the value stored under `key`.
    async fn save(&self, key: SecretKey, value: &str) -> Result<(), StorageError>;

    /// Read the value under `key`, `None` if it was never set.
    async fn retrieve(&self, key: SecretKey) -> Result<Option<String>, StorageError>;

    /// Remove `key`. Deleting a missing key succeeds.
    async fn delete(&self, key: SecretKey) -> Result<(), StorageError>;
}

/// Write a group of entries as one unit. `None` deletes the key.
///
/// On the first failing write every entry already touched is put back to
/// its previous value, then the original error is returned.
///
/// # Errors
/// Returns the error of the read or write that failed
pub async fn replace_entries<S: SecretStore + ?Sized>(
    store: &S,
    entries: &[(SecretKey, Option<&str>)],
) -> Result<(), StorageError> {
    let mut previous = Vec::with_capacity(entries.len());
    for (key, _) in entries {
        previous.push((*key, store.retrieve(*key).await?));
    }

    for (written, (key, value)) in entries.iter().enumerate() {
        let result = match value {
            Some(value) => store.save(*key, value).await,
            None => store.delete(*key).await,
        };
        if let Err(e) = result {
            restore(store, &previous[..=written]).await;
            return Err(e);
        }
    }
    Ok(())
}

async fn restore<S: SecretStore + ?Sized>(store: &S, previous: &[(SecretKey, Option<String>)]) {
    for (key, value) in previous {
        let result = match value {
            Some(value) => store.save(*key, value).await,
            None => store.delete(*key).await,
        };
        if let Err(e) = result {
            warn!(key = %key, error = %e, "Failed to restore secret after a partial write");
        }
    }
}
