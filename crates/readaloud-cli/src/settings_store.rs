//! JSON-file implementation of the settings repository.
//!
//! Settings live in a single pretty-printed JSON document. A missing file
//! means "never saved" and loads as defaults; unknown or missing fields are
//! tolerated through `SpeechSettings`' serde defaults.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use readaloud_core::{RepositoryError, SettingsRepository, SpeechSettings};

/// File name used under the platform config directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Resolve the settings file path.
///
/// Resolution order:
/// 1. An explicit path (`--config` / `READALOUD_CONFIG`)
/// 2. The platform config directory (e.g. `~/.config/readaloud/settings.json`)
/// 3. `./readaloud-settings.json` when no config directory exists
pub fn resolve_settings_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    dirs::config_dir().map_or_else(
        || PathBuf::from("readaloud-settings.json"),
        |dir| dir.join("readaloud").join(SETTINGS_FILE_NAME),
    )
}

/// Settings repository backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonSettingsRepository {
    path: PathBuf,
}

impl JsonSettingsRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsRepository for JsonSettingsRepository {
    async fn load(&self) -> Result<SpeechSettings, RepositoryError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No settings file, using defaults");
                return Ok(SpeechSettings::default());
            }
            Err(e) => return Err(RepositoryError::Storage(e.to_string())),
        };

        serde_json::from_str(&contents).map_err(|e| {
            RepositoryError::Serialization(format!("{}: {e}", self.path.display()))
        })
    }

    async fn save(&self, settings: &SpeechSettings) -> Result<(), RepositoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        tracing::debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}
