//! Speech playback error types.

/// Errors surfaced by the speech crate's fallible entry points.
///
/// Playback commands themselves never fail; faults during a session are
/// reported as [`PlaybackEvent::Failed`](readaloud_core::PlaybackEvent) and
/// the `Error` state instead.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    /// No usable speech engine was found.
    #[error("Speech engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine could not be initialised.
    #[error("Speech engine initialisation failed: {0}")]
    EngineInit(String),

    /// The engine failed to speak an utterance.
    #[error("Speech synthesis failed for {utterance}: {message}")]
    Synthesis { utterance: String, message: String },

    /// The playback session task has shut down.
    #[error("Playback session is closed")]
    SessionClosed,

    /// The session host must be spawned from inside a tokio runtime.
    #[error("No tokio runtime available to host the playback session")]
    NoRuntime,

    /// IO error (engine process spawn, pipes).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let err = SpeechError::Synthesis {
            utterance: "content_2@7".to_string(),
            message: "device busy".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Speech synthesis failed for content_2@7: device busy"
        );

        let io: SpeechError = std::io::Error::new(std::io::ErrorKind::NotFound, "espeak-ng").into();
        assert!(matches!(io, SpeechError::Io(_)));
    }
}
