//! Settings service: validated, change-aware access to the speech settings.

use std::sync::Arc;

use thiserror::Error;

use crate::ports::{RepositoryError, SettingsRepository};
use crate::settings::{
    SettingField, SettingsError, SpeechSettings, SpeechSettingsUpdate, validate_settings,
};

/// Errors raised by [`SettingsService`].
#[derive(Debug, Error)]
pub enum SettingsServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Invalid(#[from] SettingsError),
}

/// Result of [`SettingsService::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsChange {
    /// Settings after the update.
    pub settings: SpeechSettings,

    /// Fields whose values actually changed.
    pub changed: Vec<SettingField>,
}

impl SettingsChange {
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.changed.is_empty()
    }

    /// Whether some change only takes effect when a reading session starts.
    #[must_use]
    pub fn needs_new_session(&self) -> bool {
        self.changed
            .iter()
            .any(|field| !field.applies_to_next_utterance())
    }
}

/// Service for settings operations.
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
}

impl SettingsService {
    /// Create a new settings service.
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
        Self { repo }
    }

    /// Get current settings.
    pub async fn get(&self) -> Result<SpeechSettings, SettingsServiceError> {
        Ok(self.repo.load().await?)
    }

    /// Update settings with partial changes.
    ///
    /// The merged result is validated before anything is written, and
    /// nothing is written when no value actually changes.
    pub async fn update(
        &self,
        update: SpeechSettingsUpdate,
    ) -> Result<SettingsChange, SettingsServiceError> {
        let current = self.repo.load().await?;
        let mut next = current.clone();
        next.merge(&update);
        validate_settings(&next)?;

        let changed = current.changed_fields(&next);
        if changed.is_empty() {
            tracing::debug!("Settings update changes nothing, skipping save");
        } else {
            self.repo.save(&next).await?;
            let fields: Vec<_> = changed.iter().map(|f| f.name()).collect();
            tracing::info!(?fields, "Speech settings updated");
        }

        Ok(SettingsChange {
            settings: next,
            changed,
        })
    }

    /// Save complete settings (validates first).
    pub async fn save(&self, settings: &SpeechSettings) -> Result<(), SettingsServiceError> {
        validate_settings(settings)?;
        Ok(self.repo.save(settings).await?)
    }

    /// Restore and persist the defaults.
    pub async fn reset(&self) -> Result<SpeechSettings, SettingsServiceError> {
        let defaults = SpeechSettings::default();
        self.repo.save(&defaults).await?;
        Ok(defaults)
    }
}
