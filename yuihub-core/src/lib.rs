//! # YuiHub Core
//!
//! Shared building blocks for the YuiHub client:
//! - Secret storage ([`SecretStore`], [`MemoryStore`], optionally [`KeyringStore`])
//! - A change-announcing wrapper over a store ([`SecretVault`])
//! - The in-memory token cache and credential resolution
//!   ([`CredentialCache`], [`CredentialResolver`])
//! - User settings ([`Settings`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use yuihub_core::{CredentialCache, CredentialResolver, SecretVault, Settings, create_store};
//!
//! let settings = Settings::load()?;
//! let vault = Arc::new(SecretVault::new(Arc::from(create_store(true))));
//! let cache = Arc::new(CredentialCache::new());
//! cache.refresh(&vault).await?;
//! cache.clone().listen(vault.clone());
//!
//! let resolver = CredentialResolver::new(cache, settings.fallback_api_key());
//! ```

pub mod credential;
pub mod settings;
pub mod store;
pub mod vault;

pub use credential::{CredentialCache, CredentialResolver};

pub use settings::{AuthHeaderPreference, AuthScheme, Settings, SettingsError};

pub use store::{API_KEY_SECRET, MemoryStore, Secret, SecretStore, StoreError, create_store};

#[cfg(feature = "keyring-store")]
pub use store::KeyringStore;

pub use vault::{SecretChanged, SecretVault};
