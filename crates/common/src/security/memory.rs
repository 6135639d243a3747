//! Process-local secret store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::secret_store::{SecretKey, SecretStore, StorageError};

/// Secret store that never leaves the process.
///
/// Suitable for ephemeral sessions and as the store behind unit and
/// integration tests.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    entries: Mutex<HashMap<SecretKey, String>>,
}

impl InMemorySecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn save(&self, key: SecretKey, value: &str) -> Result<(), StorageError> {
        self.entries.lock().await.insert(key, value.to_string());
        Ok(())
    }

    async fn retrieve(&self, key: SecretKey) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().await.get(&key).cloned())
    }

    async fn delete(&self, key: SecretKey) -> Result<(), StorageError> {
        self.entries.lock().await.remove(&key);
        Ok(())
    }
}
