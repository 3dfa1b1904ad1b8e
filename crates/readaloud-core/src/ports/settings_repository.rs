//! Settings repository port.
//!
//! Persistence of [`SpeechSettings`] as a whole. The storage technology (a
//! JSON file for the CLI, a platform key-value store elsewhere) stays behind
//! this trait.

use async_trait::async_trait;
use thiserror::Error;

use crate::settings::SpeechSettings;

/// Errors raised by settings persistence.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Storage backend error (filesystem, key-value store, ...).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Repository for speech settings persistence.
///
/// # Design Rules
///
/// - Works with the domain [`SpeechSettings`] type directly
/// - Implementation handles serialization internally
/// - `load` returns defaults when nothing has been stored yet
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Load speech settings.
    async fn load(&self) -> Result<SpeechSettings, RepositoryError>;

    /// Save speech settings.
    async fn save(&self, settings: &SpeechSettings) -> Result<(), RepositoryError>;
}
