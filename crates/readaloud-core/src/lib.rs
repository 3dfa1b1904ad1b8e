//! Core domain types and port definitions for readaloud.
//!
//! This crate holds everything the playback controller and its adapters agree
//! on: the [`PlaybackState`] machine labels, the engine and playback event
//! unions, typed utterance identifiers, the speech settings value object, and
//! the ports ([`SpeechEngine`], [`PlaybackObserver`], [`SettingsRepository`])
//! that concrete engines, presentation layers and stores implement.
//!
//! Nothing here talks to a synthesis engine; see `readaloud-speech` for the
//! controller, the engine adapter and the session host.

#![deny(unused_crate_dependencies)]

pub mod events;
pub mod ports;
pub mod services;
pub mod settings;
pub mod state;
pub mod utterance;

// Re-export commonly used types for convenience
pub use events::{EngineEvent, NO_SESSION, PlaybackEvent, SessionId};
pub use ports::{
    EngineEventSender, NoopObserver, PlaybackObserver, QueueMode, RepositoryError,
    SettingsRepository, SpeechEngine, VoiceDescriptor,
};
pub use services::{SettingsChange, SettingsService, SettingsServiceError};
pub use settings::{
    DEFAULT_LANGUAGES, DEFAULT_MAX_CHUNK_CHARS, DEFAULT_RESUME_LOOKBACK_CHARS,
    DEFAULT_TITLE_PAUSE_MS, SettingField, SettingsError, SpeechSettings, SpeechSettingsUpdate,
    validate_settings,
};
pub use state::PlaybackState;
pub use utterance::{ParseUtteranceIdError, UtteranceId, UtteranceKind};

#[cfg(test)]
use serde_json as _;
