//! Client settings.
//!
//! Settings are read from `settings.toml` in the platform config directory
//! (e.g. `~/.config/yuihub/settings.toml` on Linux). Every field has a
//! default, so a missing file or a partial file is fine.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::{Host, Url};

use crate::store::Secret;

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid setting {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Which header carries the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AuthHeaderPreference {
    /// Start with `Authorization` and swap headers once on 401/403.
    #[default]
    #[serde(rename = "auto")]
    Auto,
    /// Always use `Authorization`.
    #[serde(rename = "authorization")]
    Authorization,
    /// Always use `x-yuihub-token`.
    #[serde(rename = "x-yuihub-token")]
    Token,
}

impl FromStr for AuthHeaderPreference {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "authorization" => Ok(Self::Authorization),
            "x-yuihub-token" => Ok(Self::Token),
            other => Err(SettingsError::Invalid {
                name: "auth_header",
                message: format!("unknown header preference: {}", other),
            }),
        }
    }
}

impl fmt::Display for AuthHeaderPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Authorization => write!(f, "authorization"),
            Self::Token => write!(f, "x-yuihub-token"),
        }
    }
}

/// How the `Authorization` header value is formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// `Bearer <credential>`.
    #[default]
    Bearer,
    /// The credential verbatim.
    None,
}

impl FromStr for AuthScheme {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "bearer" => Ok(Self::Bearer),
            "none" => Ok(Self::None),
            other => Err(SettingsError::Invalid {
                name: "auth_scheme",
                message: format!("unknown auth scheme: {}", other),
            }),
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer => write!(f, "bearer"),
            Self::None => write!(f, "none"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the YuiHub service.
    pub base_url: String,

    /// Fallback API key, used when no token is in the secure store.
    pub api_key: String,

    pub auth_header: AuthHeaderPreference,

    pub auth_scheme: AuthScheme,

    /// Budget for a single HTTP attempt, in milliseconds.
    pub request_timeout_ms: u64,

    /// Include (truncated) response bodies in HTTP diagnostics.
    pub log_response_bodies: bool,

    pub search_limit: u32,

    pub default_thread_id: Option<String>,

    pub default_author: String,

    pub default_source: String,

    /// Logging level used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Saving a whole document at or above this size needs confirmation.
    pub save_confirm_threshold_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8787".to_string(),
            api_key: String::new(),
            auth_header: AuthHeaderPreference::Auto,
            auth_scheme: AuthScheme::Bearer,
            request_timeout_ms: 15_000,
            log_response_bodies: false,
            search_limit: 10,
            default_thread_id: None,
            default_author: "yuihub-cli".to_string(),
            default_source: "cli".to_string(),
            log_level: "info".to_string(),
            save_confirm_threshold_bytes: 8192,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "(none)" } else { "***" })
            .field("auth_header", &self.auth_header)
            .field("auth_scheme", &self.auth_scheme)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("log_response_bodies", &self.log_response_bodies)
            .field("search_limit", &self.search_limit)
            .field("default_thread_id", &self.default_thread_id)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Load settings from the default location, or defaults if absent.
    pub fn load() -> Result<Self, SettingsError> {
        match default_settings_path() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load settings from `path`, or defaults if the file does not exist.
    pub fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            debug!("no settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse settings from a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        let mut settings: Settings = toml::from_str(contents)?;
        settings.base_url = settings.base_url.trim_end_matches('/').to_string();
        Ok(settings)
    }

    /// The base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// The configured fallback API key, if non-blank.
    pub fn fallback_api_key(&self) -> Option<Secret> {
        (!self.api_key.trim().is_empty()).then(|| Secret::new(self.api_key.as_str()))
    }

    /// Whether the base URL is plain HTTP to a non-loopback host.
    ///
    /// Unparseable URLs are not flagged here; they fail at request time.
    pub fn is_insecure_remote(&self) -> bool {
        let Ok(url) = Url::parse(self.base_url()) else {
            return false;
        };
        if url.scheme() != "http" {
            return false;
        }
        match url.host() {
            Some(Host::Domain(domain)) => !domain.eq_ignore_ascii_case("localhost"),
            Some(Host::Ipv4(ip)) => !ip.is_loopback(),
            Some(Host::Ipv6(ip)) => !ip.is_loopback(),
            None => false,
        }
    }
}

/// Default location of the settings file.
pub fn default_settings_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("settings.toml"))
}

/// Platform directories for YuiHub files.
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "yuihub")
}
