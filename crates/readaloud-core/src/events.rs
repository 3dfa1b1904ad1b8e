//! Event unions crossing the engine → controller → observer boundaries.
//!
//! - [`EngineEvent`]: raised by a [`SpeechEngine`](crate::SpeechEngine) on its
//!   own execution context and funnelled into the controller's owner task.
//! - [`PlaybackEvent`]: raised by the controller for the session host and its
//!   observers.

use serde::{Deserialize, Serialize};

use crate::state::PlaybackState;
use crate::utterance::UtteranceId;

/// Opaque identifier of the content being read (e.g. a story id).
pub type SessionId = u64;

/// Session id meaning "nothing loaded".
pub const NO_SESSION: SessionId = 0;

/// Callbacks from the synthesis engine, normalised into one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Asynchronous initialisation finished successfully.
    Ready,

    /// Asynchronous initialisation failed.
    InitFailed { reason: String },

    /// The engine started speaking an utterance.
    UtteranceStarted { id: UtteranceId },

    /// An utterance completed or was interrupted by `stop()` / a replace.
    UtteranceFinished { id: UtteranceId },

    /// The engine is about to speak `char_start..char_end` of the utterance.
    RangeStart {
        id: UtteranceId,
        char_start: usize,
        char_end: usize,
    },

    /// The engine failed to speak an utterance.
    Error { id: UtteranceId, message: String },
}

impl EngineEvent {
    /// Utterance the event refers to, if any.
    #[must_use]
    pub const fn utterance(&self) -> Option<&UtteranceId> {
        match self {
            Self::Ready | Self::InitFailed { .. } => None,
            Self::UtteranceStarted { id }
            | Self::UtteranceFinished { id }
            | Self::RangeStart { id, .. }
            | Self::Error { id, .. } => Some(id),
        }
    }
}

/// Events emitted by the controller to the host / presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// Controller state changed.
    StateChanged {
        /// Session current at the time of the transition.
        session: SessionId,
        state: PlaybackState,
    },

    /// Normalised reading position (0–100).
    Progress { session: SessionId, percent: u8 },

    /// A session failed (initialisation or synthesis). Followed by
    /// `StateChanged(Error)`.
    Failed { session: SessionId, message: String },
}

impl PlaybackEvent {
    /// Session the event pertains to.
    #[must_use]
    pub const fn session(&self) -> SessionId {
        match self {
            Self::StateChanged { session, .. }
            | Self::Progress { session, .. }
            | Self::Failed { session, .. } => *session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utterance_is_none_for_lifecycle_events() {
        assert!(EngineEvent::Ready.utterance().is_none());
        let failed = EngineEvent::InitFailed {
            reason: "no engine".into(),
        };
        assert!(failed.utterance().is_none());
    }

    #[test]
    fn utterance_is_exposed_for_range_events() {
        let id = UtteranceId::content(2, 1);
        let event = EngineEvent::RangeStart {
            id,
            char_start: 4,
            char_end: 9,
        };
        assert_eq!(event.utterance(), Some(&id));
    }

    #[test]
    fn playback_event_wire_format_is_tagged() {
        let event = PlaybackEvent::Progress {
            session: 7,
            percent: 42,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["session"], 7);
        assert_eq!(json["percent"], 42);
        assert_eq!(event.session(), 7);
    }
}
