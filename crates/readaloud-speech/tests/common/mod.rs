//! Scripted engine shared by the integration tests.
//!
//! The engine never speaks: it records every command, and tests drive the
//! event side by hand through [`EngineRecorder::emit`].

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use readaloud_core::{
    EngineEvent, EngineEventSender, QueueMode, SpeechEngine, UtteranceId, VoiceDescriptor,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Init,
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
    Stop,
    Rate(f32),
    Pitch(f32),
    Voice(Option<String>),
    Language(String),
    Shutdown,
}

/// Test-side view of a [`ScriptedEngine`].
#[derive(Clone, Default)]
pub struct EngineRecorder {
    calls: Arc<Mutex<Vec<Call>>>,
    events: Arc<Mutex<Option<EngineEventSender>>>,
}

impl EngineRecorder {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Return and forget the calls recorded so far.
    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    /// Texts spoken (not silences), in order.
    pub fn spoken_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Speak { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Id of the most recent speak or silence command.
    pub fn last_utterance(&self) -> Option<UtteranceId> {
        self.calls().into_iter().rev().find_map(|c| match c {
            Call::Speak { id, .. } | Call::Silence { id, .. } => Some(id),
            _ => None,
        })
    }

    /// Inject an engine event as if the engine emitted it.
    pub fn emit(&self, event: EngineEvent) {
        let sender = self.events.lock().unwrap().clone();
        sender.expect("engine was not initialised").emit(event);
    }

    pub fn was_initialized(&self) -> bool {
        self.events.lock().unwrap().is_some()
    }
}

/// A [`SpeechEngine`] that records commands and speaks nothing.
pub struct ScriptedEngine {
    recorder: EngineRecorder,
    voices: Vec<VoiceDescriptor>,
}

impl ScriptedEngine {
    pub fn new() -> (Self, EngineRecorder) {
        let recorder = EngineRecorder::default();
        let engine = Self {
            recorder: recorder.clone(),
            voices: vec![
                VoiceDescriptor::new("vi-voice", "vi-VN"),
                VoiceDescriptor::new("en-voice", "en-US"),
            ],
        };
        (engine, recorder)
    }

    fn record(&self, call: Call) {
        self.recorder.calls.lock().unwrap().push(call);
    }
}

impl SpeechEngine for ScriptedEngine {
    fn initialize(&mut self, events: EngineEventSender) {
        *self.recorder.events.lock().unwrap() = Some(events);
        self.record(Call::Init);
    }

    fn speak(&mut self, text: &str, mode: QueueMode, id: UtteranceId) {
        self.record(Call::Speak {
            text: text.to_string(),
            mode,
            id,
        });
    }

    fn speak_silence(&mut self, duration: Duration, mode: QueueMode, id: UtteranceId) {
        self.record(Call::Silence { duration, mode, id });
    }

    fn stop(&mut self) {
        self.record(Call::Stop);
    }

    fn set_rate(&mut self, rate: f32) {
        self.record(Call::Rate(rate));
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.record(Call::Pitch(pitch));
    }

    fn set_voice(&mut self, name: Option<&str>) -> bool {
        self.record(Call::Voice(name.map(str::to_string)));
        name.is_none_or(|n| self.voices.iter().any(|v| v.name == n))
    }

    fn set_language(&mut self, locale: &str) -> bool {
        self.record(Call::Language(locale.to_string()));
        self.voices.iter().any(|v| v.speaks(locale))
    }

    fn list_voices(&self) -> Vec<VoiceDescriptor> {
        self.voices.clone()
    }

    fn shutdown(&mut self) {
        self.record(Call::Shutdown);
    }
}

/// A body long enough to need three chunks at 3500 chars.
pub fn long_text() -> String {
    let mut text = "The quick brown fox jumps over the lazy dog. ".repeat(230);
    text.truncate(10_000);
    text
}
