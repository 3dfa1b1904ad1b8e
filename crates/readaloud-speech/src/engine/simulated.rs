//! Timer-driven engine that "speaks" without producing audio.
//!
//! Words are paced at `rate × words_per_minute` and each one is announced
//! with a range event, so the controller sees the same event traffic a real
//! engine produces. Used by the CLI's `--engine simulated` mode and by
//! tests.

use std::time::Duration;

use tokio::sync::mpsc;

use readaloud_core::{
    EngineEvent, EngineEventSender, QueueMode, SpeechEngine, UtteranceId, VoiceDescriptor,
};

use super::queue::{self, Performer, Queued, Utterance, VoiceParams, WorkerCommand};

/// Default speaking pace at rate 1.0.
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 180;

/// Behaviour knobs for [`SimulatedEngine`].
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Delay before `Ready` (or `InitFailed`) is reported.
    pub init_delay: Duration,

    /// Pace at rate 1.0.
    pub words_per_minute: u32,

    /// Voices on offer.
    pub voices: Vec<VoiceDescriptor>,

    /// Report this reason instead of becoming ready.
    pub init_failure: Option<String>,

    /// Fail any utterance whose text contains this marker.
    pub fail_on_text: Option<String>,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            init_delay: Duration::from_millis(50),
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
            voices: vec![
                VoiceDescriptor::new("sim-vi-female", "vi-VN"),
                VoiceDescriptor::new("sim-vi-male", "vi-VN"),
                VoiceDescriptor::new("sim-en-female", "en-US"),
            ],
            init_failure: None,
            fail_on_text: None,
        }
    }
}

/// A [`SpeechEngine`] backed by tokio timers.
pub struct SimulatedEngine {
    config: SimulatedConfig,
    worker: Option<mpsc::UnboundedSender<WorkerCommand>>,
    rate: f32,
    pitch: f32,
    voice: Option<String>,
    language: Option<String>,
}

impl SimulatedEngine {
    #[must_use]
    pub const fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            worker: None,
            rate: 1.0,
            pitch: 1.0,
            voice: None,
            language: None,
        }
    }

    /// The language selected through [`SpeechEngine::set_language`].
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    fn params(&self) -> VoiceParams {
        VoiceParams {
            rate: self.rate,
            pitch: self.pitch,
            voice: self.voice.clone().or_else(|| self.language.clone()),
        }
    }

    fn enqueue(&self, id: UtteranceId, utterance: Utterance, mode: QueueMode) {
        self.send(WorkerCommand::Enqueue {
            item: Queued {
                id,
                utterance,
                params: self.params(),
            },
            mode,
        });
    }

    fn send(&self, command: WorkerCommand) {
        match &self.worker {
            Some(worker) => {
                if worker.send(command).is_err() {
                    tracing::debug!("Simulated engine worker has exited");
                }
            }
            None => tracing::debug!("Simulated engine not initialised, dropping command"),
        }
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new(SimulatedConfig::default())
    }
}

impl SpeechEngine for SimulatedEngine {
    fn initialize(&mut self, events: EngineEventSender) {
        self.shutdown();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            events.emit(EngineEvent::InitFailed {
                reason: "simulated engine needs a tokio runtime".to_string(),
            });
            return;
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let delay = self.config.init_delay;
        let failure = self.config.init_failure.clone();
        let pacer = Pacer {
            words_per_minute: self.config.words_per_minute.max(1),
            fail_on_text: self.config.fail_on_text.clone(),
        };

        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(reason) = failure {
                events.emit(EngineEvent::InitFailed { reason });
                return;
            }
            events.emit(EngineEvent::Ready);
            queue::run_worker(rx, events, pacer).await;
        });
        self.worker = Some(tx);
    }

    fn speak(&mut self, text: &str, mode: QueueMode, id: UtteranceId) {
        self.enqueue(id, Utterance::Text(text.to_owned()), mode);
    }

    fn speak_silence(&mut self, duration: Duration, mode: QueueMode, id: UtteranceId) {
        self.enqueue(id, Utterance::Silence(duration), mode);
    }

    fn stop(&mut self) {
        self.send(WorkerCommand::Stop);
    }

    fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
    }

    fn set_voice(&mut self, name: Option<&str>) -> bool {
        match name {
            None => {
                self.voice = None;
                true
            }
            Some(name) if self.config.voices.iter().any(|v| v.name == name) => {
                self.voice = Some(name.to_owned());
                true
            }
            Some(_) => false,
        }
    }

    fn set_language(&mut self, locale: &str) -> bool {
        let supported = self.config.voices.iter().any(|v| v.speaks(locale));
        if supported {
            self.language = Some(locale.to_owned());
        }
        supported
    }

    fn list_voices(&self) -> Vec<VoiceDescriptor> {
        self.config.voices.clone()
    }

    fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.send(WorkerCommand::Shutdown);
        }
    }
}

impl Drop for SimulatedEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Pacing ─────────────────────────────────────────────────────────

struct Pacer {
    words_per_minute: u32,
    fail_on_text: Option<String>,
}

impl Performer for Pacer {
    fn perform<'a>(
        &'a mut self,
        item: &'a Queued,
        events: &'a EngineEventSender,
    ) -> impl std::future::Future<Output = Result<(), String>> + Send + 'a {
        async move {
            match &item.utterance {
                Utterance::Silence(duration) => {
                    tokio::time::sleep(*duration).await;
                    Ok(())
                }
                Utterance::Text(text) => {
                    if let Some(marker) = &self.fail_on_text {
                        if text.contains(marker.as_str()) {
                            return Err(format!("simulated failure on {marker:?}"));
                        }
                    }
                    let per_word = word_duration(self.words_per_minute, item.params.rate);
                    for (char_start, char_end) in queue::word_spans(text) {
                        events.emit(EngineEvent::RangeStart {
                            id: item.id,
                            char_start,
                            char_end,
                        });
                        tokio::time::sleep(per_word).await;
                    }
                    Ok(())
                }
            }
        }
    }
}

/// Time one word takes at `rate` (clamped to 0.1–10; a non-finite rate
/// counts as 1.0).
fn word_duration(words_per_minute: u32, rate: f32) -> Duration {
    let rate = if rate.is_finite() { rate.clamp(0.1, 10.0) } else { 1.0 };
    let words_per_second = f64::from(words_per_minute.max(1)) * f64::from(rate) / 60.0;
    Duration::from_secs_f64(1.0 / words_per_second)
}
