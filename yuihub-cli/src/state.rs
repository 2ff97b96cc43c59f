//! Per-user state remembered between runs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Contents of the state file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateData {
    /// Format version.
    version: u32,

    /// Thread most recently issued or used for saving.
    current_thread: Option<String>,

    updated_at: Option<DateTime<Utc>>,
}

impl Default for StateData {
    fn default() -> Self {
        Self {
            version: 1,
            current_thread: None,
            updated_at: None,
        }
    }
}

/// JSON-backed store for the current thread.
#[derive(Debug)]
pub struct ThreadState {
    path: PathBuf,
    data: StateData,
}

impl ThreadState {
    /// Default location: `state.json` in the platform data directory.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = yuihub_core::settings::project_dirs()
            .context("could not determine a data directory for YuiHub")?;
        Ok(dirs.data_dir().join("state.json"))
    }

    /// Load state from `path`; a missing file is empty state.
    pub fn load_from_path(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read state file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("corrupt state file {}", path.display()))?
        } else {
            StateData::default()
        };

        Ok(Self { path, data })
    }

    /// The remembered thread, if any.
    pub fn current_thread(&self) -> Option<&str> {
        self.data.current_thread.as_deref().filter(|t| !t.is_empty())
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.data.updated_at
    }

    /// Remember `thread` as the current thread and write the file.
    pub fn set_current_thread(&mut self, thread: &str) -> Result<()> {
        self.data.current_thread = Some(thread.to_string());
        self.data.updated_at = Some(Utc::now());
        self.save()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, contents)
            .with_context(|| format!("failed to write state file {}", self.path.display()))?;
        debug!("saved state to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let state = ThreadState::load_from_path(temp.path().join("state.json")).unwrap();
        assert_eq!(state.current_thread(), None);
        assert_eq!(state.updated_at(), None);
    }

    #[test]
    fn test_persistence() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("state.json");

        let mut state = ThreadState::load_from_path(path.clone()).unwrap();
        state.set_current_thread("th-01").unwrap();

        let reloaded = ThreadState::load_from_path(path).unwrap();
        assert_eq!(reloaded.current_thread(), Some("th-01"));
        assert!(reloaded.updated_at().is_some());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        fs::write(&path, "not json").unwrap();

        assert!(ThreadState::load_from_path(path).is_err());
    }
}
