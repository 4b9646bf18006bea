//! Persisted local settings for the remote store connection.
//!
//! Two values (base URL and API key) live in a small JSON file. On startup the
//! file is read and, when it is missing, incomplete, or holds a value that must
//! never be used from this client, the configured defaults are written back.

use crate::errors::{AppError, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of service-role keys that bypass row-level security.
const SECRET_KEY_PREFIX: &str = "sb_secret_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub store_url: String,
    pub store_key: String,
}

impl Settings {
    pub fn new(store_url: impl Into<String>, store_key: impl Into<String>) -> Self {
        Self {
            store_url: store_url.into(),
            store_key: store_key.into(),
        }
    }

    /// A stored pair is usable unless it is empty, points at a local
    /// placeholder host, or carries a secret-class key.
    pub fn is_usable(&self) -> bool {
        let url = self.store_url.trim();
        let key = self.store_key.trim();

        !url.is_empty()
            && !key.is_empty()
            && !url.contains("localhost")
            && !key.starts_with(SECRET_KEY_PREFIX)
    }

    /// Reads settings from `path`, rewriting them with `defaults` when the
    /// stored values are absent or unusable.
    pub fn load_or_heal(path: &Path, defaults: &Settings) -> Result<Settings, AppError> {
        match Self::read(path) {
            Some(stored) if stored.is_usable() => {
                tracing::info!("Loaded store settings from {}", path.display());
                Ok(stored)
            }
            Some(_) => {
                tracing::warn!(
                    "Stored settings at {} are insecure or placeholders, restoring defaults",
                    path.display()
                );
                defaults.save(path)?;
                Ok(defaults.clone())
            }
            None => {
                tracing::info!("No stored settings at {}, writing defaults", path.display());
                defaults.save(path)?;
                Ok(defaults.clone())
            }
        }
    }

    fn read(path: &Path) -> Option<Settings> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str::<Settings>(&content) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!("Ignoring malformed settings file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Writes the settings through a temp file and rename.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let body = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        Ok(())
    }
}
