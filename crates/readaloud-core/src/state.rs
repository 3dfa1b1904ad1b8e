//! Playback state machine labels.
//!
//! ```text
//!   Idle → Initializing → Ready ⇄ Playing ⇄ Paused
//!                           ▲        │
//!                           └────────┘   (any state) → Error
//! ```
//!
//! `Error` and `Ready` both accept a fresh start. Shutdown is reachable from
//! anywhere and leaves the controller in `Idle` for good.

use serde::{Deserialize, Serialize};

/// Current state of the speech playback controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Engine not yet initialised, or released by shutdown.
    #[default]
    Idle,

    /// Engine initialisation is in flight; start requests are queued.
    Initializing,

    /// Engine ready, nothing playing.
    Ready,

    /// An utterance of the current session is being spoken.
    Playing,

    /// Playback paused by the user; the cursor is preserved.
    Paused,

    /// Engine initialisation or an utterance failed.
    Error,
}

impl PlaybackState {
    /// Short lowercase label used in logs and the CLI status line.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Error => "error",
        }
    }

    /// Whether a session is live (playing or paused).
    #[must_use]
    pub const fn is_ongoing(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }

    /// Whether the engine can accept new playback right away.
    #[must_use]
    pub const fn accepts_start(self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Paused | Self::Error)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle() {
        assert_eq!(PlaybackState::default(), PlaybackState::Idle);
    }

    #[test]
    fn ongoing_covers_playing_and_paused_only() {
        assert!(PlaybackState::Playing.is_ongoing());
        assert!(PlaybackState::Paused.is_ongoing());
        assert!(!PlaybackState::Ready.is_ongoing());
        assert!(!PlaybackState::Error.is_ongoing());
    }

    #[test]
    fn start_is_deferred_while_not_initialised() {
        assert!(!PlaybackState::Idle.accepts_start());
        assert!(!PlaybackState::Initializing.accepts_start());
        assert!(PlaybackState::Error.accepts_start());
    }

    #[test]
    fn serializes_as_snake_case_label() {
        let json = serde_json::to_string(&PlaybackState::Initializing).unwrap();
        assert_eq!(json, "\"initializing\"");
        assert_eq!(PlaybackState::Paused.to_string(), "paused");
    }
}
