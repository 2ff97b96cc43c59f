//! Command implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use yuihub_client::{RequestExecutor, SaveRequest, SavedNote, SearchResponse, YuiHubClient};
use yuihub_core::{
    API_KEY_SECRET, AuthHeaderPreference, AuthScheme, CredentialCache, CredentialResolver, Secret,
    SecretStore, SecretVault, Settings, create_store,
};

use crate::state::ThreadState;

/// Command-line values that take precedence over the settings file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub auth_header: Option<AuthHeaderPreference>,
    pub auth_scheme: Option<AuthScheme>,
    pub timeout_ms: Option<u64>,
}

/// Load settings from `path` (or the default location) and apply overrides.
pub fn load_settings(path: Option<&Path>, overrides: &Overrides) -> Result<Settings> {
    let mut settings = match path {
        Some(path) => Settings::load_from_path(path)?,
        None => Settings::load()?,
    };

    if let Some(base_url) = &overrides.base_url {
        settings.base_url = base_url.trim_end_matches('/').to_string();
    }
    if let Some(auth_header) = overrides.auth_header {
        settings.auth_header = auth_header;
    }
    if let Some(auth_scheme) = overrides.auth_scheme {
        settings.auth_scheme = auth_scheme;
    }
    if let Some(timeout_ms) = overrides.timeout_ms {
        settings.request_timeout_ms = timeout_ms;
    }

    Ok(settings)
}

/// Masked one-line view of the effective settings.
pub fn startup_summary(settings: &Settings, has_credential: bool) -> String {
    format!(
        "baseUrl={} apiKey={} authHeader={} authScheme={} timeoutMs={} logBodies={}",
        settings.base_url(),
        if has_credential { "***" } else { "(none)" },
        settings.auth_header,
        settings.auth_scheme,
        settings.request_timeout_ms,
        settings.log_response_bodies
    )
}

/// Text to save and where it came from.
#[derive(Debug)]
pub struct SaveInput {
    pub text: String,
    /// The text is a whole file rather than a fragment piped in.
    pub whole_document: bool,
    pub thread: Option<String>,
    pub author: Option<String>,
    pub source: Option<String>,
    /// The user passed `--yes`.
    pub confirmed: bool,
}

/// Check `input` before anything is sent.
pub fn validate_save(input: &SaveInput, threshold_bytes: usize) -> Result<()> {
    if input.text.trim().is_empty() {
        bail!("Nothing to save: the text is empty");
    }
    if input.whole_document && input.text.len() >= threshold_bytes && !input.confirmed {
        bail!(
            "The document is {} bytes (limit {}). Pass --yes to save it anyway",
            input.text.len(),
            threshold_bytes
        );
    }
    Ok(())
}

/// Everything a command needs: settings, secrets and the HTTP client.
pub struct App {
    settings: Settings,
    vault: Arc<SecretVault>,
    cache: Arc<CredentialCache>,
    credentials: CredentialResolver,
    client: YuiHubClient,
    state: ThreadState,
    listener: JoinHandle<()>,
}

impl App {
    /// Set up from settings, using the OS keyring when `use_keyring` is set.
    pub async fn start(settings: Settings, use_keyring: bool, state: ThreadState) -> Result<Self> {
        let store: Arc<dyn SecretStore> = Arc::from(create_store(use_keyring));
        Self::with_store(settings, store, state).await
    }

    pub async fn with_store(
        settings: Settings,
        store: Arc<dyn SecretStore>,
        state: ThreadState,
    ) -> Result<Self> {
        let vault = Arc::new(SecretVault::new(store));
        let cache = Arc::new(CredentialCache::new());
        if let Err(e) = cache.refresh(&vault).await {
            warn!("could not read the API token from secure storage: {}", e);
        }
        let listener = cache.clone().listen(vault.clone());

        let credentials = CredentialResolver::new(cache.clone(), settings.fallback_api_key());
        let executor = RequestExecutor::from_settings(&settings, credentials.clone())
            .context("failed to set up the HTTP client")?;

        let app = Self {
            settings,
            vault,
            cache,
            credentials,
            client: YuiHubClient::new(executor),
            state,
            listener,
        };
        app.log_startup();
        Ok(app)
    }

    fn log_startup(&self) {
        info!(
            "YuiHub: {}",
            startup_summary(&self.settings, self.credentials.resolve().is_some())
        );
        if self.settings.is_insecure_remote() {
            warn!(
                "{} uses plain HTTP to a remote host; the API token is sent unencrypted",
                self.settings.base_url()
            );
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn thread_state(&self) -> &ThreadState {
        &self.state
    }

    pub fn has_credential(&self) -> bool {
        self.credentials.resolve().is_some()
    }

    /// `OK version=... env=...` or `Not OK`.
    pub async fn health(&self) -> Result<String> {
        Ok(self.client.health().await?.summary())
    }

    /// Search with an explicit limit or the configured one.
    pub async fn search(&self, query: &str, limit: Option<u32>) -> Result<SearchResponse> {
        if query.trim().is_empty() {
            bail!("Search query is empty");
        }
        let limit = limit.unwrap_or(self.settings.search_limit);
        Ok(self.client.search(query, Some(limit)).await?)
    }

    /// Issue a new thread and make it current.
    pub async fn issue_thread(&mut self) -> Result<String> {
        let thread = self.client.issue_thread().await?;
        self.state.set_current_thread(&thread)?;
        Ok(thread)
    }

    /// The configured default thread, else the remembered one.
    pub fn current_thread(&self) -> Option<String> {
        self.settings
            .default_thread_id
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.state.current_thread())
            .map(str::to_string)
    }

    /// Save `input` to the explicit, current or a freshly issued thread.
    pub async fn save(&mut self, input: SaveInput) -> Result<SavedNote> {
        validate_save(&input, self.settings.save_confirm_threshold_bytes)?;

        let thread = match input.thread.filter(|t| !t.trim().is_empty()) {
            Some(thread) => thread,
            None => match self.current_thread() {
                Some(thread) => thread,
                None => {
                    debug!("no current thread, issuing one");
                    self.issue_thread().await?
                }
            },
        };

        let request = SaveRequest {
            source: input
                .source
                .unwrap_or_else(|| self.settings.default_source.clone()),
            thread,
            author: input
                .author
                .unwrap_or_else(|| self.settings.default_author.clone()),
            text: input.text,
        };
        let note = self.client.save(&request).await?;
        self.state.set_current_thread(&note.thread)?;
        Ok(note)
    }

    /// Store `token` verbatim in secure storage; blank input clears it.
    pub async fn set_token(&self, token: &str) -> Result<()> {
        if token.trim().is_empty() {
            return self.clear_token().await;
        }
        self.vault
            .store(API_KEY_SECRET, &Secret::new(token))
            .await
            .context("failed to store the API token")?;
        self.cache.refresh(&self.vault).await?;
        Ok(())
    }

    pub async fn clear_token(&self) -> Result<()> {
        self.vault
            .delete(API_KEY_SECRET)
            .await
            .context("failed to clear the API token")?;
        self.cache.refresh(&self.vault).await?;
        Ok(())
    }

    /// Masked description of where the credential comes from.
    pub fn token_status(&self) -> String {
        if self.cache.current().is_some() {
            "API token: *** (secure storage)".to_string()
        } else if self.settings.fallback_api_key().is_some() {
            "API token: *** (settings file)".to_string()
        } else {
            "API token: (none)".to_string()
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
