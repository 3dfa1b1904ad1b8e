//! Port definitions for the playback core.
//!
//! Ports are the seams the controller is written against:
//!
//! - [`SpeechEngine`]: the opaque synthesis engine capability.
//! - [`PlaybackObserver`]: a presentation-layer listener for state and
//!   progress.
//! - [`SettingsRepository`]: persistence for [`SpeechSettings`](crate::SpeechSettings).
//!
//! Concrete engines live in `readaloud-speech::engine`; observers live in
//! whatever binds the host to a UI (the CLI prints a status line).

mod engine;
mod observer;
mod settings_repository;

pub use engine::{EngineEventSender, QueueMode, SpeechEngine, VoiceDescriptor};
pub use observer::{NoopObserver, PlaybackObserver};
pub use settings_repository::{RepositoryError, SettingsRepository};
