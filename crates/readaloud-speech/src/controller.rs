//! Speech controller: the playback state machine.
//!
//! ```text
//!   Idle → Initializing → Ready ⇄ Playing ⇄ Paused
//!                           ▲        │
//!                           └─ Error ◄┘   (any state may fail)
//! ```
//!
//! A reading session is spoken as `title → silence → chunk 0 → chunk 1 …`.
//! Every utterance id carries the *epoch* it was issued in. Starting,
//! pausing, resuming, stopping and failing all advance the epoch, so engine
//! events from interrupted work are recognised and dropped.
//!
//! Pausing sets a recoverable-stop marker before the engine is stopped. The
//! engine reports the interrupted utterance as finished, and that one
//! completion is swallowed instead of advancing to the next chunk.

use readaloud_core::{
    EngineEvent, EngineEventSender, NO_SESSION, PlaybackEvent, PlaybackState, SessionId,
    SpeechSettings, UtteranceId, UtteranceKind,
};
use tokio::sync::mpsc;

use crate::adapter::EngineAdapter;
use crate::chunking::{self, Chunk};

// ── Session data ───────────────────────────────────────────────────

/// The text currently being read.
#[derive(Debug)]
struct Session {
    id: SessionId,
    title: String,
    /// Full body text; immutable once set.
    text: Vec<char>,
    /// Chunk table for the current pass (whole body, or the suffix after a
    /// resume). Starts are offsets into `text`.
    chunks: Vec<Chunk>,
    /// Whether `chunks` was built by a resume.
    resumed: bool,
}

/// Reading position inside the current session.
#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    absolute_offset: usize,
    chunk_index: usize,
    title_consumed: bool,
}

/// A start request held until the engine is ready.
#[derive(Debug)]
struct PendingRequest {
    session: SessionId,
    title: String,
    text: String,
}

// ── Controller ─────────────────────────────────────────────────────

/// Owns all playback state and drives the engine through the adapter.
///
/// Emits [`PlaybackEvent`]s on the channel returned by
/// [`new`](Self::new). Engine events are fed back in through
/// [`handle_engine_event`](Self::handle_engine_event) by whoever owns the
/// controller (normally [`PlaybackSession`](crate::PlaybackSession)).
pub struct SpeechController {
    state: PlaybackState,
    adapter: EngineAdapter,
    settings: SpeechSettings,
    event_tx: mpsc::UnboundedSender<PlaybackEvent>,

    /// Current utterance generation.
    epoch: u64,

    /// Epoch whose next completion must be ignored (set by `pause`).
    recoverable_stop: Option<u64>,

    session: Option<Session>,
    cursor: Cursor,
    pending: Option<PendingRequest>,

    /// The last initialisation attempt failed; the next start retries it.
    init_failed: bool,

    shut_down: bool,
}

impl SpeechController {
    /// Create a controller in `Idle`.
    ///
    /// Returns the controller and a receiver for [`PlaybackEvent`]s.
    #[must_use]
    pub fn new(
        adapter: EngineAdapter,
        settings: SpeechSettings,
    ) -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let controller = Self {
            state: PlaybackState::Idle,
            adapter,
            settings,
            event_tx,
            epoch: 0,
            recoverable_stop: None,
            session: None,
            cursor: Cursor::default(),
            pending: None,
            init_failed: false,
            shut_down: false,
        };
        (controller, event_rx)
    }

    // ── Queries ────────────────────────────────────────────────────

    #[must_use]
    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    /// Id of the current session, or [`NO_SESSION`].
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session.as_ref().map_or(NO_SESSION, |s| s.id)
    }

    /// Title of the current session, if any.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.title.as_str())
    }

    /// Absolute reading position in characters.
    #[must_use]
    pub const fn absolute_offset(&self) -> usize {
        self.cursor.absolute_offset
    }

    /// Number of chunks in the active chunk table.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.chunks.len())
    }

    /// Whether a start request is waiting for the engine.
    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub const fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    #[must_use]
    pub const fn settings(&self) -> &SpeechSettings {
        &self.settings
    }

    /// The engine adapter (voice listing etc.).
    #[must_use]
    pub const fn adapter(&self) -> &EngineAdapter {
        &self.adapter
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Start engine initialisation; engine events are delivered to `events`.
    ///
    /// Saved rate, pitch and voice are queued so they apply once the engine
    /// is ready. Only valid from `Idle`.
    pub fn initialize(&mut self, events: EngineEventSender) {
        if self.shut_down || self.state != PlaybackState::Idle {
            tracing::debug!(state = ?self.state, "Ignoring initialize");
            return;
        }

        tracing::info!("Initialising speech controller");
        self.set_state(PlaybackState::Initializing);
        self.adapter.initialize(events);
        self.queue_settings();
    }

    /// Release the engine permanently. Every later call is a no-op.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }

        tracing::info!("Shutting down speech controller");
        self.next_epoch();
        self.recoverable_stop = None;
        self.pending = None;
        self.adapter.release();
        self.clear_session();
        self.set_state(PlaybackState::Idle);
        self.shut_down = true;
    }

    // ── Commands ───────────────────────────────────────────────────

    /// Apply synthesis parameters for subsequent utterances.
    ///
    /// Rate and pitch are clamped to 0.5–2.0; a non-finite value keeps the
    /// previous one. An unknown voice falls back to the engine default.
    pub fn configure(&mut self, rate: f32, pitch: f32, voice: Option<&str>) {
        if self.shut_down {
            return;
        }

        self.settings.rate = speech_parameter("rate", rate, self.settings.rate);
        self.settings.pitch = speech_parameter("pitch", pitch, self.settings.pitch);
        self.settings.voice = voice.map(str::to_owned);
        tracing::debug!(
            rate = self.settings.rate,
            pitch = self.settings.pitch,
            voice = ?self.settings.voice,
            "Speech parameters updated"
        );
        self.queue_settings();
    }

    /// Start reading `text` (preceded by `title` when non-empty) as
    /// session `session`, replacing whatever is current.
    ///
    /// If the engine is not ready yet the request is held (a later request
    /// overwrites it) and started on ready. After a failed initialisation
    /// this also retries initialisation.
    pub fn start_reading(&mut self, session: SessionId, title: &str, text: &str) {
        if self.shut_down {
            return;
        }

        if !(self.state.accepts_start() && self.adapter.is_ready()) {
            let request = PendingRequest {
                session,
                title: title.to_owned(),
                text: text.to_owned(),
            };
            if let Some(previous) = self.pending.replace(request) {
                tracing::debug!(
                    replaced = previous.session,
                    session,
                    "Replacing queued reading request"
                );
            } else {
                tracing::debug!(session, state = ?self.state, "Engine not ready, queueing request");
            }
            if self.init_failed {
                self.retry_initialization();
            }
            return;
        }

        let text: Vec<char> = text.chars().collect();
        let chunks = chunking::split_chars(&text, 0, self.settings.max_chunk_chars);
        tracing::info!(
            session,
            text_chars = text.len(),
            chunks = chunks.len(),
            has_title = !title.trim().is_empty(),
            "Starting reading session"
        );

        self.recoverable_stop = None;

        if chunks.is_empty() {
            // Nothing to read: drop the old session and settle in Ready.
            self.next_epoch();
            self.adapter.stop();
            self.clear_session();
            self.set_state(PlaybackState::Ready);
            return;
        }

        self.session = Some(Session {
            id: session,
            title: title.to_owned(),
            text,
            chunks,
            resumed: false,
        });
        self.emit(PlaybackEvent::Progress { session, percent: 0 });
        self.play_from_start();
    }

    /// Pause playback, keeping the reading position. Only from `Playing`.
    pub fn pause(&mut self) {
        if self.shut_down || self.state != PlaybackState::Playing {
            tracing::debug!(state = ?self.state, "Ignoring pause");
            return;
        }

        // Marker first: the engine may report the interrupted utterance as
        // finished while `stop()` is still running.
        self.recoverable_stop = Some(self.epoch);
        self.next_epoch();
        self.adapter.stop();
        self.set_state(PlaybackState::Paused);

        tracing::info!(
            session = self.session_id(),
            offset = self.cursor.absolute_offset,
            "Reading paused"
        );
    }

    /// Resume from the last sentence or word boundary before the paused
    /// position. Only from `Paused`.
    pub fn resume(&mut self) {
        if self.shut_down || self.state != PlaybackState::Paused {
            tracing::debug!(state = ?self.state, "Ignoring resume");
            return;
        }

        if !self.cursor.title_consumed {
            tracing::info!(session = self.session_id(), "Resuming from the title");
            self.play_from_start();
            return;
        }

        let max_chars = self.settings.max_chunk_chars;
        let lookback = self.settings.resume_lookback_chars;
        let offset = self.cursor.absolute_offset;

        let Some(session) = self.session.as_mut() else {
            self.set_state(PlaybackState::Ready);
            return;
        };

        let restart = chunking::natural_break_before(&session.text, offset, lookback);
        let chunks = chunking::split_chars(&session.text, restart, max_chars);
        tracing::info!(
            session = session.id,
            paused_at = offset,
            restart,
            chunks = chunks.len(),
            "Resuming reading"
        );

        if chunks.is_empty() {
            self.complete_session();
            return;
        }

        session.chunks = chunks;
        session.resumed = true;
        self.next_epoch();
        self.speak_chunk(0, false);
        self.set_state(PlaybackState::Playing);
    }

    /// Stop playback and forget the session, settling in `Ready`. Idempotent.
    ///
    /// A controller that was never initialised stays `Idle`. After a failed
    /// initialisation the engine is still down, so the next start retries it.
    pub fn stop(&mut self) {
        if self.shut_down {
            return;
        }

        self.recoverable_stop = None;
        if self.pending.take().is_some() {
            tracing::debug!("Dropped queued reading request");
        }
        self.next_epoch();
        self.adapter.stop();

        if self.session.is_some() {
            tracing::info!(session = self.session_id(), "Reading stopped");
        }
        if self.state != PlaybackState::Idle {
            self.set_state(PlaybackState::Ready);
        }
        self.clear_session();
    }

    // ── Engine events ──────────────────────────────────────────────

    /// Feed one engine event into the state machine.
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        if self.shut_down {
            return;
        }

        match event {
            EngineEvent::Ready => self.on_ready(),
            EngineEvent::InitFailed { reason } => self.on_init_failed(&reason),
            EngineEvent::UtteranceStarted { id } => self.on_utterance_started(id),
            EngineEvent::RangeStart { id, char_start, .. } => self.on_range_start(id, char_start),
            EngineEvent::UtteranceFinished { id } => self.on_utterance_finished(id),
            EngineEvent::Error { id, message } => self.on_utterance_error(id, &message),
        }
    }

    fn on_ready(&mut self) {
        if self.adapter.is_ready() {
            tracing::debug!("Duplicate engine ready event");
            return;
        }

        self.init_failed = false;
        let language = self.adapter.mark_ready(&self.settings.languages);
        tracing::info!(language = ?language, "Speech engine ready");

        if matches!(
            self.state,
            PlaybackState::Idle | PlaybackState::Initializing | PlaybackState::Error
        ) {
            self.set_state(PlaybackState::Ready);
        }

        if let Some(request) = self.pending.take() {
            self.start_reading(request.session, &request.title, &request.text);
        }
    }

    fn on_init_failed(&mut self, reason: &str) {
        tracing::warn!(reason, "Speech engine failed to initialise");
        self.adapter.mark_failed();
        self.init_failed = true;

        let session = self
            .pending
            .take()
            .map_or_else(|| self.session_id(), |request| request.session);
        self.emit(PlaybackEvent::Failed {
            session,
            message: format!("speech engine failed to initialise: {reason}"),
        });
        self.set_state(PlaybackState::Error);
    }

    fn on_utterance_started(&mut self, id: UtteranceId) {
        if id.epoch != self.epoch {
            return;
        }
        self.set_state(PlaybackState::Playing);
    }

    fn on_range_start(&mut self, id: UtteranceId, char_start: usize) {
        if id.epoch != self.epoch || !id.tracks_position() {
            return;
        }
        let Some(index) = id.kind.chunk_index() else {
            return;
        };
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let Some(chunk) = session.chunks.get(index) else {
            return;
        };

        let total = session.text.len();
        let offset = (chunk.start + char_start)
            .min(total)
            .max(self.cursor.absolute_offset);
        self.cursor.absolute_offset = offset;

        let percent = progress_percent(offset, total);
        let session = session.id;
        self.emit(PlaybackEvent::Progress { session, percent });
    }

    fn on_utterance_finished(&mut self, id: UtteranceId) {
        if let Some(marked) = self.recoverable_stop {
            if id.epoch == marked {
                self.recoverable_stop = None;
                tracing::debug!(%id, "Ignoring completion of paused utterance");
                return;
            }
            if id.epoch > marked {
                // The paused utterance never reported; the marker is stale.
                self.recoverable_stop = None;
            }
        }

        if id.epoch != self.epoch {
            tracing::debug!(%id, epoch = self.epoch, "Ignoring stale completion");
            return;
        }

        match id.kind {
            UtteranceKind::Title => {
                self.cursor.title_consumed = true;
                let silence = UtteranceId::silence(self.epoch);
                self.adapter.speak_silence(self.settings.title_pause(), silence);
                self.speak_chunk(0, true);
            }
            UtteranceKind::Silence => {}
            UtteranceKind::Content(index) | UtteranceKind::Resume(index) => {
                if index + 1 < self.chunk_count() {
                    self.speak_chunk(index + 1, false);
                } else {
                    tracing::info!(session = self.session_id(), "Reading finished");
                    self.complete_session();
                }
            }
        }
    }

    fn on_utterance_error(&mut self, id: UtteranceId, message: &str) {
        if id.epoch != self.epoch {
            tracing::debug!(%id, "Ignoring error from stale utterance");
            return;
        }

        tracing::warn!(%id, error = message, "Speech engine failed to speak utterance");
        self.next_epoch();
        self.adapter.stop();
        self.emit(PlaybackEvent::Failed {
            session: self.session_id(),
            message: format!("failed to speak {id}: {message}"),
        });
        self.set_state(PlaybackState::Error);
    }

    // ── Internal helpers ───────────────────────────────────────────

    /// Speak the current session from the top: the title (if any), then
    /// chunk 0 of the full body.
    fn play_from_start(&mut self) {
        let max_chars = self.settings.max_chunk_chars;
        let epoch = self.next_epoch();
        self.cursor = Cursor::default();

        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.resumed {
            session.chunks = chunking::split_chars(&session.text, 0, max_chars);
            session.resumed = false;
        }

        if session.title.trim().is_empty() {
            self.cursor.title_consumed = true;
            self.speak_chunk(0, false);
        } else {
            self.adapter.speak_replace(&session.title, UtteranceId::title(epoch));
        }
        self.set_state(PlaybackState::Playing);
    }

    /// Speak chunk `index` of the active table and move the cursor to it.
    fn speak_chunk(&mut self, index: usize, append: bool) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let Some(chunk) = session.chunks.get(index) else {
            return;
        };

        let id = if session.resumed {
            UtteranceId::resume(self.epoch, index)
        } else {
            UtteranceId::content(self.epoch, index)
        };
        self.cursor.chunk_index = index;
        self.cursor.absolute_offset = chunk.start;

        if append {
            self.adapter.speak_append(&chunk.text, id);
        } else {
            self.adapter.speak_replace(&chunk.text, id);
        }
    }

    /// End of story: settle in `Ready` with progress reset.
    fn complete_session(&mut self) {
        let session = self.session_id();
        self.next_epoch();
        self.set_state(PlaybackState::Ready);
        self.emit(PlaybackEvent::Progress {
            session,
            percent: 0,
        });
        self.clear_session();
    }

    fn retry_initialization(&mut self) {
        if self.adapter.reinitialize() {
            self.init_failed = false;
            tracing::info!("Retrying speech engine initialisation");
            self.set_state(PlaybackState::Initializing);
            self.queue_settings();
        }
    }

    /// Push the current rate, pitch and voice to the adapter.
    fn queue_settings(&mut self) {
        self.adapter.set_rate(self.settings.rate);
        self.adapter.set_pitch(self.settings.pitch);
        self.adapter.set_voice(self.settings.voice.as_deref());
    }

    fn clear_session(&mut self) {
        self.session = None;
        self.cursor = Cursor::default();
    }

    const fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Transition to a new state and emit a state-change event.
    fn set_state(&mut self, new_state: PlaybackState) {
        if self.state != new_state {
            tracing::debug!(old = ?self.state, new = ?new_state, "Playback state transition");
            self.state = new_state;
            self.emit(PlaybackEvent::StateChanged {
                session: self.session_id(),
                state: new_state,
            });
        }
    }

    /// Emit a playback event (best-effort: if the receiver is dropped, we log and move on).
    fn emit(&self, event: PlaybackEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::warn!("Playback event receiver dropped");
        }
    }
}

impl Drop for SpeechController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Clamp a rate or pitch to 0.5–2.0, keeping `previous` when `value` is NaN
/// or infinite.
fn speech_parameter(name: &str, value: f32, previous: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.5, 2.0)
    } else {
        tracing::warn!(parameter = name, value, "Ignoring non-finite speech parameter");
        previous
    }
}

/// `offset / total` as a rounded percentage in 0–100.
fn progress_percent(offset: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (offset.min(total) * 100 + total / 2) / total;
    u8::try_from(percent).unwrap_or(100)
}
