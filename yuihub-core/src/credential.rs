//! Credential caching and resolution.
//!
//! The API token lives in a secure store, which may be slow to query. The
//! [`CredentialCache`] keeps the latest known value in memory and is
//! refreshed whenever the [`SecretVault`] announces a change. The
//! [`CredentialResolver`] combines that cache with the plain fallback value
//! from the settings file.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::{API_KEY_SECRET, Secret, StoreError};
use crate::vault::SecretVault;

/// In-memory copy of the securely stored API token.
#[derive(Debug, Default)]
pub struct CredentialCache {
    token: RwLock<Option<Secret>>,
}

impl CredentialCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache already holding `token`.
    pub fn with_token(token: Secret) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }

    /// The cached token, if any.
    pub fn current(&self) -> Option<Secret> {
        self.token.read().clone()
    }

    /// Replace the cached token. Blank values are stored as absent.
    pub fn replace(&self, token: Option<Secret>) {
        *self.token.write() = token.filter(|t| !t.is_blank());
    }

    /// Re-read the token from the vault.
    pub async fn refresh(&self, vault: &SecretVault) -> Result<(), StoreError> {
        let token = vault.get(API_KEY_SECRET).await?;
        debug!(
            "credential cache refreshed: token={}",
            if token.is_some() { "***" } else { "(none)" }
        );
        self.replace(token);
        Ok(())
    }

    /// Refresh the cache every time the API token changes in `vault`.
    ///
    /// The returned task ends when the vault is dropped.
    pub fn listen(self: Arc<Self>, vault: Arc<SecretVault>) -> JoinHandle<()> {
        let mut changes = vault.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) if change.key != API_KEY_SECRET => continue,
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        if let Err(e) = self.refresh(&vault).await {
                            warn!("failed to refresh API token: {}", e);
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Produces the API key for the next request.
///
/// A non-blank token from the secure store wins; otherwise the configured
/// fallback is used; otherwise there is no credential and requests go out
/// unauthenticated.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    cache: Arc<CredentialCache>,
    fallback: Option<Secret>,
}

impl CredentialResolver {
    /// Create a resolver over `cache` with an optional configured fallback.
    pub fn new(cache: Arc<CredentialCache>, fallback: Option<Secret>) -> Self {
        Self {
            cache,
            fallback: fallback.filter(|f| !f.is_blank()),
        }
    }

    /// A resolver that always yields no credential.
    pub fn anonymous() -> Self {
        Self::new(Arc::new(CredentialCache::new()), None)
    }

    /// Resolve the credential for the next request.
    pub fn resolve(&self) -> Option<Secret> {
        self.cache
            .current()
            .filter(|t| !t.is_blank())
            .or_else(|| self.fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::time::Duration;

    #[test]
    fn test_stored_token_wins_over_fallback() {
        let cache = Arc::new(CredentialCache::with_token(Secret::new("stored")));
        let resolver = CredentialResolver::new(cache, Some(Secret::new("configured")));
        assert_eq!(resolver.resolve().unwrap().expose(), "stored");
    }

    #[test]
    fn test_fallback_used_when_store_empty() {
        let cache = Arc::new(CredentialCache::with_token(Secret::new("")));
        let resolver = CredentialResolver::new(cache, Some(Secret::new("configured")));
        assert_eq!(resolver.resolve().unwrap().expose(), "configured");
    }

    #[test]
    fn test_absent_when_nothing_configured() {
        let resolver = CredentialResolver::new(
            Arc::new(CredentialCache::new()),
            Some(Secret::new("  ")),
        );
        assert!(resolver.resolve().is_none());
        assert!(CredentialResolver::anonymous().resolve().is_none());
    }

    #[test]
    fn test_resolver_sees_cache_updates() {
        let cache = Arc::new(CredentialCache::new());
        let resolver = CredentialResolver::new(cache.clone(), None);
        assert!(resolver.resolve().is_none());

        cache.replace(Some(Secret::new("rotated")));
        assert_eq!(resolver.resolve().unwrap().expose(), "rotated");
    }

    #[tokio::test]
    async fn test_listen_refreshes_on_change() {
        let vault = Arc::new(SecretVault::new(Arc::new(MemoryStore::new())));
        let cache = Arc::new(CredentialCache::new());
        let handle = cache.clone().listen(vault.clone());

        vault.store(API_KEY_SECRET, &Secret::new("fresh")).await.unwrap();

        let mut seen = None;
        for _ in 0..50 {
            seen = cache.current();
            if seen.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(seen.unwrap().expose(), "fresh");

        vault.delete(API_KEY_SECRET).await.unwrap();
        for _ in 0..50 {
            if cache.current().is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(cache.current().is_none());

        handle.abort();
    }
}
