//! Secret store wrapper that announces changes.
//!
//! [`SecretVault`] forwards reads and writes to a [`SecretStore`] and
//! broadcasts a [`SecretChanged`] event after every successful `set` or
//! `delete`, so that caches holding a copy of a secret can refresh.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::store::{Secret, SecretStore, StoreError};

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Notification that the secret stored under `key` was written or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretChanged {
    pub key: String,
}

/// A [`SecretStore`] with change notifications.
pub struct SecretVault {
    store: Arc<dyn SecretStore>,
    changes: broadcast::Sender<SecretChanged>,
}

impl SecretVault {
    /// Wrap a store.
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { store, changes }
    }

    /// Read a secret.
    pub async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        self.store.get(key).await
    }

    /// Write a secret and notify subscribers.
    pub async fn store(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        self.store.set(key, secret).await?;
        self.notify(key);
        Ok(())
    }

    /// Remove a secret and notify subscribers.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.store.delete(key).await?;
        self.notify(key);
        Ok(())
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SecretChanged> {
        self.changes.subscribe()
    }

    fn notify(&self, key: &str) {
        // No receivers is not an error: nobody caches the value yet.
        let receivers = self
            .changes
            .send(SecretChanged {
                key: key.to_string(),
            })
            .unwrap_or(0);
        debug!("secret {} changed, notified {} subscriber(s)", key, receivers);
    }
}

impl std::fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretVault")
            .field("subscribers", &self.changes.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{API_KEY_SECRET, MemoryStore};

    #[tokio::test]
    async fn test_store_and_delete_notify() {
        let vault = SecretVault::new(Arc::new(MemoryStore::new()));
        let mut rx = vault.subscribe();

        vault.store(API_KEY_SECRET, &Secret::new("abc123")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().key, API_KEY_SECRET);

        vault.delete(API_KEY_SECRET).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().key, API_KEY_SECRET);
        assert!(vault.get(API_KEY_SECRET).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_without_subscribers() {
        let vault = SecretVault::new(Arc::new(MemoryStore::new()));
        vault.store(API_KEY_SECRET, &Secret::new("abc123")).await.unwrap();
        assert!(vault.get(API_KEY_SECRET).await.unwrap().is_some());
    }
}
