//! Platform keychain backend for [`SecretStore`]
//!
//! Stores every secret as its own keychain entry under a single service name
//! (macOS Keychain Access, Windows Credential Manager, Linux Secret Service).
//!
//! ## Usage
//!
//! ```no_run
//! use agentdodo_common::security::{KeychainProvider, SecretKey, SecretStore};
//!
//! # async fn demo() -> Result<(), agentdodo_common::security::StorageError> {
//! let keychain = KeychainProvider::new("com.agentdodo.credentials");
//! keychain.save(SecretKey::ClientId, "my-client-id").await?;
//! let client_id = keychain.retrieve(SecretKey::ClientId).await?;
//! assert_eq!(client_id.as_deref(), Some("my-client-id"));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use keyring::Entry;
use tokio::sync::Mutex;
use tracing::debug;

use super::secret_store::{SecretKey, SecretStore, StorageError};

/// Keychain-backed secret store
///
/// Keychain calls block, so each one runs on the blocking pool. A mutex keeps
/// operations from interleaving.
pub struct KeychainProvider {
    service_name: Arc<str>,
    guard: Mutex<()>,
}

impl KeychainProvider {
    /// Create a provider for a service identifier (e.g.
    /// `"com.agentdodo.credentials"`).
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: Arc::from(service_name.into()), guard: Mutex::new(()) }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    async fn run<T, F>(&self, key: SecretKey, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(Entry) -> Result<T, StorageError> + Send + 'static,
    {
        let _serialized = self.guard.lock().await;
        let service = Arc::clone(&self.service_name);
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, key.as_str()).map_err(|e| {
                StorageError::Unavailable(format!("failed to open keychain entry {key}: {e}"))
            })?;
            op(entry)
        })
        .await
        .map_err(|e| StorageError::AccessFailed(format!("keychain task failed: {e}")))?
    }
}

#[async_trait]
impl SecretStore for KeychainProvider {
    async fn save(&self, key: SecretKey, value: &str) -> Result<(), StorageError> {
        debug!(service = %self.service_name, key = %key, "Storing secret in keychain");

        let value = value.to_string();
        self.run(key, move |entry| {
            entry.set_password(&value).map_err(|e| {
                StorageError::AccessFailed(format!("failed to store secret for {key}: {e}"))
            })
        })
        .await?;

        debug!(service = %self.service_name, key = %key, "Secret stored successfully");
        Ok(())
    }

    async fn retrieve(&self, key: SecretKey) -> Result<Option<String>, StorageError> {
        debug!(service = %self.service_name, key = %key, "Retrieving secret from keychain");

        self.run(key, move |entry| match entry.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::AccessFailed(format!(
                "failed to retrieve secret for {key}: {e}"
            ))),
        })
        .await
    }

    async fn delete(&self, key: SecretKey) -> Result<(), StorageError> {
        debug!(service = %self.service_name, key = %key, "Deleting secret from keychain");

        self.run(key, move |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StorageError::AccessFailed(format!(
                "failed to delete secret for {key}: {e}"
            ))),
        })
        .await?;

        debug!(service = %self.service_name, key = %key, "Secret deleted successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_service_name() {
        let keychain = KeychainProvider::new("com.agentdodo.test");
        assert_eq!(keychain.service_name(), "com.agentdodo.test");
    }

    // Touches the real OS keychain; run manually with `--ignored`.
    #[tokio::test]
    #[ignore = "requires an unlocked platform keychain"]
    async fn round_trips_through_platform_keychain() {
        let keychain = KeychainProvider::new("com.agentdodo.test");
        keychain.save(SecretKey::Username, "dodo").await.unwrap();
        assert_eq!(keychain.retrieve(SecretKey::Username).await.unwrap().as_deref(), Some("dodo"));
        keychain.delete(SecretKey::Username).await.unwrap();
        assert!(keychain.retrieve(SecretKey::Username).await.unwrap().is_none());
    }
}
