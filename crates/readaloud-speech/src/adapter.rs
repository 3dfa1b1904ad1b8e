//! Engine adapter: the only owner of the speech engine handle.
//!
//! The controller speaks in typed commands (replace, append, silence, stop,
//! setters). The adapter forwards them to the engine once it has reported
//! ready and buffers them before that, so nothing the controller issues
//! during initialisation is lost. After [`EngineAdapter::release`] every
//! command is dropped.

use std::time::Duration;

use readaloud_core::{EngineEventSender, QueueMode, SpeechEngine, UtteranceId, VoiceDescriptor};

// ── Commands ───────────────────────────────────────────────────────

/// A command held back until the engine is ready.
#[derive(Debug, Clone, PartialEq)]
enum EngineCommand {
    Speak {
        text: String,
        mode: QueueMode,
        id: UtteranceId,
    },
    Silence {
        duration: Duration,
        mode: QueueMode,
        id: UtteranceId,
    },
    SetRate(f32),
    SetPitch(f32),
    SetVoice(Option<String>),
}

impl EngineCommand {
    const fn is_utterance(&self) -> bool {
        matches!(self, Self::Speak { .. } | Self::Silence { .. })
    }
}

// ── Adapter ────────────────────────────────────────────────────────

/// Wraps a [`SpeechEngine`] with readiness tracking and command buffering.
pub struct EngineAdapter {
    /// Engine handle; `None` while detached or after release.
    engine: Option<Box<dyn SpeechEngine>>,

    /// Event sink handed to the engine on initialisation.
    events: Option<EngineEventSender>,

    /// Whether the engine has reported ready.
    ready: bool,

    /// Whether the engine has been released for good.
    released: bool,

    /// Commands issued before the engine was ready, in issue order.
    buffered: Vec<EngineCommand>,
}

impl EngineAdapter {
    /// Wrap an engine. Nothing reaches it until [`initialize`](Self::initialize).
    #[must_use]
    pub fn new(engine: Box<dyn SpeechEngine>) -> Self {
        Self {
            engine: Some(engine),
            events: None,
            ready: false,
            released: false,
            buffered: Vec::new(),
        }
    }

    /// An adapter with no engine yet. Commands are buffered until an engine
    /// is [attached](Self::attach) and reports ready.
    #[must_use]
    pub const fn detached() -> Self {
        Self {
            engine: None,
            events: None,
            ready: false,
            released: false,
            buffered: Vec::new(),
        }
    }

    /// Attach an engine to a detached adapter, initialising it right away
    /// if initialisation was already requested.
    pub fn attach(&mut self, engine: Box<dyn SpeechEngine>) {
        if self.released {
            tracing::debug!("Engine attached after release, dropping it");
            return;
        }
        if let Some(mut old) = self.engine.replace(engine) {
            old.shutdown();
        }
        self.ready = false;
        if let Some(events) = self.events.clone() {
            self.start_engine(events);
        }
    }

    /// Request engine initialisation, delivering engine events to `events`.
    ///
    /// Without an engine attached the request is remembered and carried out
    /// by [`attach`](Self::attach).
    pub fn initialize(&mut self, events: EngineEventSender) {
        if self.released {
            return;
        }
        self.events = Some(events.clone());
        if self.engine.is_some() {
            self.start_engine(events);
        } else {
            tracing::debug!("No engine attached yet, deferring initialisation");
        }
    }

    /// Retry initialisation with the previously supplied event sink.
    ///
    /// Returns `false` if initialisation was never requested.
    pub fn reinitialize(&mut self) -> bool {
        match self.events.clone() {
            Some(events) => {
                self.initialize(events);
                true
            }
            None => false,
        }
    }

    /// Record that the engine reported ready: select the first supported
    /// language from `languages`, then replay buffered commands.
    ///
    /// Returns the selected language, if any.
    pub fn mark_ready(&mut self, languages: &[String]) -> Option<String> {
        if self.released {
            return None;
        }
        self.ready = true;

        let selected = self.engine.as_mut().and_then(|engine| {
            languages
                .iter()
                .find(|locale| engine.set_language(locale))
                .cloned()
        });
        if selected.is_none() && !languages.is_empty() {
            tracing::warn!(?languages, "No preferred language supported, keeping engine default");
        }

        let buffered = std::mem::take(&mut self.buffered);
        if !buffered.is_empty() {
            tracing::debug!(count = buffered.len(), "Replaying buffered engine commands");
        }
        for command in buffered {
            self.dispatch(command);
        }

        selected
    }

    /// Record that initialisation failed. Buffered settings are kept for the
    /// next attempt; buffered utterances are dropped.
    pub fn mark_failed(&mut self) {
        self.ready = false;
        self.buffered.retain(|c| !c.is_utterance());
    }

    /// Whether the engine is attached and has reported ready.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready && !self.released
    }

    /// Whether an engine handle is attached.
    #[must_use]
    pub const fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Whether [`release`](Self::release) has been called.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.released
    }

    /// Number of commands waiting for the engine.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }

    // ── Speech commands ────────────────────────────────────────────

    /// Speak `text`, interrupting and discarding everything queued.
    pub fn speak_replace(&mut self, text: &str, id: UtteranceId) {
        self.submit(EngineCommand::Speak {
            text: text.to_owned(),
            mode: QueueMode::Replace,
            id,
        });
    }

    /// Speak `text` after everything already queued.
    pub fn speak_append(&mut self, text: &str, id: UtteranceId) {
        self.submit(EngineCommand::Speak {
            text: text.to_owned(),
            mode: QueueMode::Append,
            id,
        });
    }

    /// Queue a silent pause after everything already queued.
    pub fn speak_silence(&mut self, duration: Duration, id: UtteranceId) {
        self.submit(EngineCommand::Silence {
            duration,
            mode: QueueMode::Append,
            id,
        });
    }

    /// Stop the current utterance and drop the queue.
    pub fn stop(&mut self) {
        if self.released {
            return;
        }
        if self.is_ready() {
            if let Some(engine) = self.engine.as_mut() {
                engine.stop();
            }
        } else {
            self.buffered.retain(|c| !c.is_utterance());
        }
    }

    // ── Synthesis parameters ───────────────────────────────────────

    pub fn set_rate(&mut self, rate: f32) {
        self.submit(EngineCommand::SetRate(rate));
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.submit(EngineCommand::SetPitch(pitch));
    }

    /// Select a voice; unknown names fall back to the engine default.
    pub fn set_voice(&mut self, name: Option<&str>) {
        self.submit(EngineCommand::SetVoice(name.map(str::to_owned)));
    }

    // ── Voices ─────────────────────────────────────────────────────

    /// All voices the engine offers (empty when no engine is attached).
    #[must_use]
    pub fn list_voices(&self) -> Vec<VoiceDescriptor> {
        self.engine
            .as_ref()
            .map(|engine| engine.list_voices())
            .unwrap_or_default()
    }

    /// Voices matching the first preferred language, or all voices when
    /// none match.
    #[must_use]
    pub fn preferred_voices(&self, languages: &[String]) -> Vec<VoiceDescriptor> {
        preferred_voices(self.list_voices(), languages)
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Shut the engine down permanently.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        if let Some(mut engine) = self.engine.take() {
            tracing::info!("Releasing speech engine");
            engine.shutdown();
        }
        self.released = true;
        self.ready = false;
        self.events = None;
        self.buffered.clear();
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn start_engine(&mut self, events: EngineEventSender) {
        self.ready = false;
        if let Some(engine) = self.engine.as_mut() {
            tracing::debug!("Initialising speech engine");
            engine.initialize(events);
        }
    }

    fn submit(&mut self, command: EngineCommand) {
        if self.released {
            tracing::debug!(?command, "Engine released, dropping command");
            return;
        }
        if self.is_ready() {
            self.dispatch(command);
            return;
        }

        let replaces_queue = matches!(
            command,
            EngineCommand::Speak {
                mode: QueueMode::Replace,
                ..
            } | EngineCommand::Silence {
                mode: QueueMode::Replace,
                ..
            }
        );
        if replaces_queue {
            self.buffered.retain(|c| !c.is_utterance());
        }
        self.buffered.push(command);
    }

    fn dispatch(&mut self, command: EngineCommand) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        match command {
            EngineCommand::Speak { text, mode, id } => {
                tracing::debug!(%id, ?mode, chars = text.chars().count(), "Speaking");
                engine.speak(&text, mode, id);
            }
            EngineCommand::Silence { duration, mode, id } => {
                tracing::debug!(%id, ?mode, ms = duration.as_millis(), "Queueing silence");
                engine.speak_silence(duration, mode, id);
            }
            EngineCommand::SetRate(rate) => engine.set_rate(rate),
            EngineCommand::SetPitch(pitch) => engine.set_pitch(pitch),
            EngineCommand::SetVoice(name) => {
                if !engine.set_voice(name.as_deref()) {
                    tracing::warn!(voice = ?name, "Voice not found, using engine default");
                    engine.set_voice(None);
                }
            }
        }
    }
}

impl Drop for EngineAdapter {
    fn drop(&mut self) {
        self.release();
    }
}

/// Filter `voices` down to those speaking the first preferred language.
///
/// Falls back to the full list when nothing matches (or no preference is
/// given).
#[must_use]
pub fn preferred_voices(voices: Vec<VoiceDescriptor>, languages: &[String]) -> Vec<VoiceDescriptor> {
    let Some(first) = languages.first() else {
        return voices;
    };
    let matching: Vec<_> = voices.iter().filter(|v| v.speaks(first)).cloned().collect();
    if matching.is_empty() { voices } else { matching }
}
