//! Speech engine port.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::events::EngineEvent;
use crate::utterance::UtteranceId;

/// How a new utterance interacts with the engine's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    /// Drop everything queued (interrupting the current utterance) first.
    Replace,

    /// Play after everything already queued.
    Append,
}

/// A voice offered by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceDescriptor {
    /// Engine-specific voice name (used with `set_voice`).
    pub name: String,

    /// BCP-47 style locale, e.g. `vi-VN`.
    pub locale: String,
}

impl VoiceDescriptor {
    pub fn new(name: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locale: locale.into(),
        }
    }

    /// Whether the voice speaks `language` (`"vi"` matches `"vi-VN"`).
    #[must_use]
    pub fn speaks(&self, language: &str) -> bool {
        let want = primary_subtag(language);
        !want.is_empty() && primary_subtag(&self.locale).eq_ignore_ascii_case(want)
    }
}

fn primary_subtag(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or_default()
}

/// Sending half of the engine event stream.
///
/// Handed to the engine in [`SpeechEngine::initialize`]. Cloneable so engine
/// worker tasks and OS threads can each hold one; emitting never blocks.
#[derive(Debug, Clone)]
pub struct EngineEventSender {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineEventSender {
    /// Create a connected sender/receiver pair.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit an engine event (best-effort: if the controller is gone the
    /// event is dropped).
    pub fn emit(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Engine event receiver dropped");
        }
    }

    /// Whether the receiving controller has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Backend-agnostic text-to-speech engine.
///
/// All commands are fire-and-forget: completion, progress and failure are
/// reported through the [`EngineEventSender`] received in
/// [`initialize`](SpeechEngine::initialize), never through return values.
/// Events may be emitted from any thread.
///
/// The controller only calls `speak*`, `stop` and the setters after the
/// engine has reported [`EngineEvent::Ready`].
pub trait SpeechEngine: Send {
    /// Begin asynchronous initialisation. Must eventually emit
    /// [`EngineEvent::Ready`] or [`EngineEvent::InitFailed`].
    ///
    /// May be called again after a failed initialisation.
    fn initialize(&mut self, events: EngineEventSender);

    /// Queue `text` for speaking under `id`.
    fn speak(&mut self, text: &str, mode: QueueMode, id: UtteranceId);

    /// Queue a silent pause of `duration` under `id`.
    fn speak_silence(&mut self, duration: Duration, mode: QueueMode, id: UtteranceId);

    /// Stop the current utterance and drop the queue. The interrupted
    /// utterance reports [`EngineEvent::UtteranceFinished`].
    fn stop(&mut self);

    /// Set the speech rate multiplier for subsequent utterances.
    fn set_rate(&mut self, rate: f32);

    /// Set the pitch multiplier for subsequent utterances.
    fn set_pitch(&mut self, pitch: f32);

    /// Select a voice by name (`None` = engine default).
    ///
    /// Returns `false` if the voice is unknown; the engine keeps its default.
    fn set_voice(&mut self, name: Option<&str>) -> bool;

    /// Select the speaking language. Returns `false` if unsupported.
    fn set_language(&mut self, locale: &str) -> bool;

    /// Voices the engine offers, in engine order.
    fn list_voices(&self) -> Vec<VoiceDescriptor>;

    /// Release all engine resources. No other method is called afterwards.
    fn shutdown(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_matches_on_primary_language() {
        let voice = VoiceDescriptor::new("vi-vn-x-gft-local", "vi-VN");
        assert!(voice.speaks("vi"));
        assert!(voice.speaks("vi-VN"));
        assert!(voice.speaks("VI_vn"));
        assert!(!voice.speaks("en-US"));
        assert!(!voice.speaks(""));
    }

    #[tokio::test]
    async fn sender_delivers_in_order() {
        let (tx, mut rx) = EngineEventSender::channel();
        tx.emit(EngineEvent::Ready);
        tx.emit(EngineEvent::UtteranceStarted {
            id: UtteranceId::title(1),
        });

        assert_eq!(rx.recv().await, Some(EngineEvent::Ready));
        assert_eq!(
            rx.recv().await,
            Some(EngineEvent::UtteranceStarted {
                id: UtteranceId::title(1)
            })
        );
    }

    #[test]
    fn sender_reports_closed_receiver() {
        let (tx, rx) = EngineEventSender::channel();
        assert!(!tx.is_closed());
        drop(rx);
        assert!(tx.is_closed());
        // Emitting after close is silently dropped.
        tx.emit(EngineEvent::Ready);
    }
}
