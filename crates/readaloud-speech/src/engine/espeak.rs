//! `espeak-ng` process driver.
//!
//! Each utterance runs as its own `espeak-ng` child process, with the text
//! fed on stdin. Stopping or replacing kills the child. Readiness is probed
//! with `espeak-ng --version`, and the voice list comes from
//! `espeak-ng --voices`.
//!
//! espeak-ng does not report word positions on the command line, so each
//! utterance produces a single range event covering the whole text.

use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::mpsc;

use readaloud_core::{
    EngineEvent, EngineEventSender, QueueMode, SpeechEngine, UtteranceId, VoiceDescriptor,
};

use super::queue::{self, Performer, Queued, Utterance, VoiceParams, WorkerCommand};
use crate::error::SpeechError;

/// Executable looked up on `PATH` by default.
pub const DEFAULT_PROGRAM: &str = "espeak-ng";

/// espeak-ng's own default speed (words per minute).
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// espeak-ng's default pitch on its 0–99 scale.
const BASE_PITCH: f32 = 50.0;

/// A [`SpeechEngine`] that shells out to `espeak-ng`.
pub struct EspeakEngine {
    program: String,
    voices: Arc<Mutex<Vec<VoiceDescriptor>>>,
    worker: Option<mpsc::UnboundedSender<WorkerCommand>>,
    rate: f32,
    pitch: f32,
    voice: Option<String>,
    language: Option<String>,
}

impl EspeakEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    /// Use a specific executable (path or name on `PATH`).
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            voices: Arc::new(Mutex::new(Vec::new())),
            worker: None,
            rate: 1.0,
            pitch: 1.0,
            voice: None,
            language: None,
        }
    }

    fn cached_voices(&self) -> Vec<VoiceDescriptor> {
        self.voices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn params(&self) -> VoiceParams {
        VoiceParams {
            rate: self.rate,
            pitch: self.pitch,
            voice: self.voice.clone().or_else(|| self.language.clone()),
        }
    }

    fn enqueue(&self, id: UtteranceId, utterance: Utterance, mode: QueueMode) {
        let command = WorkerCommand::Enqueue {
            item: Queued {
                id,
                utterance,
                params: self.params(),
            },
            mode,
        };
        self.send(command);
    }

    fn send(&self, command: WorkerCommand) {
        match &self.worker {
            Some(worker) => {
                if worker.send(command).is_err() {
                    tracing::debug!("espeak-ng worker has exited");
                }
            }
            None => tracing::debug!("espeak-ng engine not initialised, dropping command"),
        }
    }
}

impl Default for EspeakEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechEngine for EspeakEngine {
    fn initialize(&mut self, events: EngineEventSender) {
        self.shutdown();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            events.emit(EngineEvent::InitFailed {
                reason: SpeechError::NoRuntime.to_string(),
            });
            return;
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let program = self.program.clone();
        let voices = Arc::clone(&self.voices);

        runtime.spawn(async move {
            match probe(&program).await {
                Ok(version) => tracing::info!(%version, "espeak-ng available"),
                Err(e) => {
                    events.emit(EngineEvent::InitFailed {
                        reason: e.to_string(),
                    });
                    return;
                }
            }

            match installed_voices(&program).await {
                Ok(found) => {
                    tracing::debug!(count = found.len(), "Loaded espeak-ng voices");
                    *voices.lock().unwrap_or_else(PoisonError::into_inner) = found;
                }
                Err(e) => tracing::warn!(error = %e, "Could not list espeak-ng voices"),
            }

            events.emit(EngineEvent::Ready);
            queue::run_worker(rx, events, EspeakPlayer { program }).await;
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
        let Some(name) = name else {
            self.voice = None;
            return true;
        };
        let known = self.cached_voices().iter().any(|v| v.name == name);
        if known {
            self.voice = Some(name.to_owned());
        }
        known
    }

    fn set_language(&mut self, locale: &str) -> bool {
        let voices = self.cached_voices();
        let exact = voices
            .iter()
            .find(|v| v.locale.eq_ignore_ascii_case(locale));
        let matched = exact.or_else(|| voices.iter().find(|v| v.speaks(locale)));
        match matched {
            Some(voice) => {
                self.language = Some(voice.locale.clone());
                true
            }
            None => false,
        }
    }

    fn list_voices(&self) -> Vec<VoiceDescriptor> {
        self.cached_voices()
    }

    fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.send(WorkerCommand::Shutdown);
        }
    }
}

impl Drop for EspeakEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Process plumbing ───────────────────────────────────────────────

struct EspeakPlayer {
    program: String,
}

impl Performer for EspeakPlayer {
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
                    events.emit(EngineEvent::RangeStart {
                        id: item.id,
                        char_start: 0,
                        char_end: text.chars().count(),
                    });
                    speak_with_process(&self.program, item, text)
                        .await
                        .map_err(|e| e.to_string())
                }
            }
        }
    }
}

/// Run one `espeak-ng` child to completion. Dropping the future kills it.
async fn speak_with_process(program: &str, item: &Queued, text: &str) -> Result<(), SpeechError> {
    let mut child = Command::new(program)
        .args(speak_args(&item.params))
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes()).await?;
        // Closing stdin tells espeak-ng the text is complete.
        drop(stdin);
    }

    let output = child.wait_with_output().await?;
    if output.status.success() {
        Ok(())
    } else {
        Err(SpeechError::Synthesis {
            utterance: item.id.to_string(),
            message: format!(
                "{program} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        })
    }
}

/// Check that the executable runs; returns its version line.
async fn probe(program: &str) -> Result<String, SpeechError> {
    let output = Command::new(program)
        .arg("--version")
        .output()
        .await
        .map_err(|e| SpeechError::EngineUnavailable(format!("{program}: {e}")))?;

    if !output.status.success() {
        return Err(SpeechError::EngineInit(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string())
}

async fn installed_voices(program: &str) -> Result<Vec<VoiceDescriptor>, SpeechError> {
    let output = Command::new(program).arg("--voices").output().await?;
    Ok(parse_voices(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse the table printed by `espeak-ng --voices`.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File          Other Languages
///  5  vi              --/M      Vietnamese         aav/vi
/// ```
#[must_use]
pub fn parse_voices(listing: &str) -> Vec<VoiceDescriptor> {
    listing
        .lines()
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let priority = columns.next()?;
            if priority.parse::<u32>().is_err() {
                return None;
            }
            let language = columns.next()?;
            let _age_gender = columns.next()?;
            let name = columns.next()?;
            Some(VoiceDescriptor::new(name, language))
        })
        .collect()
}

/// Command-line arguments for one utterance (text goes on stdin).
fn speak_args(params: &VoiceParams) -> Vec<String> {
    let mut args = vec![
        "-s".to_string(),
        words_per_minute(params.rate).to_string(),
        "-p".to_string(),
        espeak_pitch(params.pitch).to_string(),
    ];
    if let Some(voice) = &params.voice {
        args.push("-v".to_string());
        args.push(voice.clone());
    }
    args.push("--stdin".to_string());
    args
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn words_per_minute(rate: f32) -> u32 {
    let rate = if rate.is_finite() { rate } else { 1.0 };
    (BASE_WORDS_PER_MINUTE * rate).round().clamp(80.0, 450.0) as u32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn espeak_pitch(pitch: f32) -> u32 {
    let pitch = if pitch.is_finite() { pitch } else { 1.0 };
    (BASE_PITCH * pitch).round().clamp(0.0, 99.0) as u32
}
