//! Playback session host: binds one [`SpeechController`] to a tokio task.
//!
//! The controller is owned by a single task that multiplexes two inputs:
//! commands from [`PlaybackSession`] handles and events from the engine.
//! Controller output ([`PlaybackEvent`]) flows through an event bridge task
//! that keeps a [`NowPlaying`] snapshot current and notifies the registered
//! [`PlaybackObserver`].
//!
//! ```text
//!   PlaybackSession ──SessionCommand──►┐
//!                                      ├─► owner task (SpeechController)
//!   SpeechEngine ─────EngineEvent─────►┘          │
//!                                           PlaybackEvent
//!                                                 ▼
//!                              event bridge ──► snapshot + observer
//! ```
//!
//! Every command is fire-and-forget.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use serde::Serialize;
use tokio::sync::mpsc;

use readaloud_core::{
    EngineEvent, EngineEventSender, NO_SESSION, PlaybackEvent, PlaybackObserver, PlaybackState,
    SessionId, SpeechEngine, SpeechSettings,
};

use crate::adapter::EngineAdapter;
use crate::controller::SpeechController;
use crate::error::SpeechError;

// ── Commands ───────────────────────────────────────────────────────

/// A command for the session's controller.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Read `text` (preceded by `title`) as session `session`.
    Start {
        session: SessionId,
        title: String,
        text: String,
    },

    Pause,

    Resume,

    /// Stop and forget the current session.
    Stop,

    /// Change synthesis parameters for subsequent utterances.
    Configure {
        rate: f32,
        pitch: f32,
        voice: Option<String>,
    },

    /// Release the engine and end the owner task.
    Shutdown,
}

// ── Snapshot ───────────────────────────────────────────────────────

/// What the session is doing right now, for notification-style consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NowPlaying {
    /// Session the state belongs to ([`NO_SESSION`] when none).
    pub session_id: SessionId,

    /// Title of that session (empty when none).
    pub title: String,

    pub state: PlaybackState,

    /// Reading progress, 0–100.
    pub progress: u8,
}

impl NowPlaying {
    /// Whether something is playing or paused.
    #[must_use]
    pub const fn is_ongoing(&self) -> bool {
        self.state.is_ongoing()
    }
}

impl Default for NowPlaying {
    fn default() -> Self {
        Self {
            session_id: NO_SESSION,
            title: String::new(),
            state: PlaybackState::Idle,
            progress: 0,
        }
    }
}

/// State shared between handles and the event bridge.
///
/// The observer slot doubles as the delivery lock: snapshot changes that
/// reach the observer, and the re-delivery on registration, both happen while
/// it is held, so an observer sees states in the order the host applied them.
/// Lock order is `observer` then `now_playing`.
#[derive(Default)]
struct Shared {
    now_playing: RwLock<NowPlaying>,
    observer: Mutex<Option<Weak<dyn PlaybackObserver>>>,
}

impl Shared {
    fn read(&self) -> NowPlaying {
        self.now_playing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update<R>(&self, f: impl FnOnce(&mut NowPlaying) -> R) -> R {
        let mut guard = self
            .now_playing
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    fn observer_slot(&self) -> MutexGuard<'_, Option<Weak<dyn PlaybackObserver>>> {
        self.observer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` to the snapshot, then hand its result to the observer
    /// (if one is alive) without releasing the delivery lock in between.
    fn publish<R>(
        &self,
        change: impl FnOnce(&mut NowPlaying) -> R,
        notify: impl FnOnce(&dyn PlaybackObserver, R),
    ) {
        let slot = self.observer_slot();
        let result = self.update(change);
        if let Some(observer) = slot.as_ref().and_then(Weak::upgrade) {
            notify(observer.as_ref(), result);
        }
    }
}

// ── Session handle ─────────────────────────────────────────────────

/// Handle to a running playback session.
///
/// Dropping the handle shuts the session down.
pub struct PlaybackSession {
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
    shared: Arc<Shared>,
}

impl PlaybackSession {
    /// Spawn the owner task and event bridge on the current tokio runtime
    /// and start initialising `engine`.
    pub fn spawn(
        engine: Box<dyn SpeechEngine>,
        settings: SpeechSettings,
    ) -> Result<Self, SpeechError> {
        Self::spawn_with_adapter(EngineAdapter::new(engine), settings)
    }

    /// Like [`spawn`](Self::spawn) with a pre-built adapter.
    pub fn spawn_with_adapter(
        adapter: EngineAdapter,
        settings: SpeechSettings,
    ) -> Result<Self, SpeechError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SpeechError::NoRuntime)?;

        let (mut controller, playback_rx) = SpeechController::new(adapter, settings);
        let (engine_tx, engine_rx) = EngineEventSender::channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());

        controller.initialize(engine_tx);
        runtime.spawn(run_owner(controller, cmd_rx, engine_rx));
        runtime.spawn(run_event_bridge(playback_rx, Arc::clone(&shared)));

        tracing::info!("Playback session started");
        Ok(Self { cmd_tx, shared })
    }

    // ── Observers ──────────────────────────────────────────────────

    /// Register `observer`, replacing any previous one.
    ///
    /// The current state and progress are delivered immediately, before any
    /// later transition. Only a weak reference is kept; dropping the observer
    /// unregisters it. Must not be called from inside an observer callback.
    pub fn register_observer(&self, observer: &Arc<dyn PlaybackObserver>) {
        let mut slot = self.shared.observer_slot();
        *slot = Some(Arc::downgrade(observer));

        let snapshot = self.shared.read();
        observer.on_state_changed(snapshot.state);
        observer.on_progress(snapshot.progress);
        drop(slot);
    }

    pub fn unregister_observer(&self) {
        self.shared.observer_slot().take();
    }

    // ── Commands ───────────────────────────────────────────────────

    /// Send a raw command to the controller.
    pub fn command(&self, command: SessionCommand) {
        match &command {
            SessionCommand::Start { session, title, .. } => {
                self.shared.update(|now| {
                    now.session_id = *session;
                    now.title.clone_from(title);
                });
            }
            SessionCommand::Stop | SessionCommand::Shutdown => {
                self.shared.update(|now| {
                    now.session_id = NO_SESSION;
                    now.title.clear();
                });
            }
            _ => {}
        }

        if self.cmd_tx.send(command).is_err() {
            tracing::debug!("Playback session closed, dropping command");
        }
    }

    pub fn start_reading(&self, session: SessionId, title: &str, text: &str) {
        self.command(SessionCommand::Start {
            session,
            title: title.to_owned(),
            text: text.to_owned(),
        });
    }

    pub fn pause(&self) {
        self.command(SessionCommand::Pause);
    }

    pub fn resume(&self) {
        self.command(SessionCommand::Resume);
    }

    pub fn stop(&self) {
        self.command(SessionCommand::Stop);
    }

    pub fn configure(&self, rate: f32, pitch: f32, voice: Option<&str>) {
        self.command(SessionCommand::Configure {
            rate,
            pitch,
            voice: voice.map(str::to_owned),
        });
    }

    /// Play/pause toggle for `session`: pauses it while playing, resumes it
    /// while paused, and otherwise starts it.
    pub fn toggle(&self, session: SessionId, title: &str, text: &str) {
        let now = self.shared.read();
        match now.state {
            PlaybackState::Playing if now.session_id == session => self.pause(),
            PlaybackState::Paused if now.session_id == session => self.resume(),
            _ => self.start_reading(session, title, text),
        }
    }

    pub fn shutdown(&self) {
        self.command(SessionCommand::Shutdown);
    }

    // ── Queries ────────────────────────────────────────────────────

    #[must_use]
    pub fn current_state(&self) -> PlaybackState {
        self.shared.read().state
    }

    #[must_use]
    pub fn current_session_id(&self) -> SessionId {
        self.shared.read().session_id
    }

    #[must_use]
    pub fn now_playing(&self) -> NowPlaying {
        self.shared.read()
    }

    /// Whether the owner task has exited.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(SessionCommand::Shutdown);
    }
}

// ── Tasks ──────────────────────────────────────────────────────────

/// Owner task: the only place the controller is touched.
async fn run_owner(
    mut controller: SpeechController,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    mut engine_events: mpsc::UnboundedReceiver<EngineEvent>,
) {
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SessionCommand::Shutdown) | None => break,
                Some(command) => apply_command(&mut controller, command),
            },
            Some(event) = engine_events.recv() => {
                tracing::trace!(?event, "Engine event");
                controller.handle_engine_event(event);
            }
        }
    }

    controller.shutdown();
    tracing::info!("Playback session ended");
}

fn apply_command(controller: &mut SpeechController, command: SessionCommand) {
    match command {
        SessionCommand::Start {
            session,
            title,
            text,
        } => controller.start_reading(session, &title, &text),
        SessionCommand::Pause => controller.pause(),
        SessionCommand::Resume => controller.resume(),
        SessionCommand::Stop => controller.stop(),
        SessionCommand::Configure { rate, pitch, voice } => {
            controller.configure(rate, pitch, voice.as_deref());
        }
        SessionCommand::Shutdown => controller.shutdown(),
    }
}

/// Relay controller events into the snapshot and the observer.
///
/// Exits once the controller (and its event sender) is dropped.
async fn run_event_bridge(
    mut events: mpsc::UnboundedReceiver<PlaybackEvent>,
    shared: Arc<Shared>,
) {
    while let Some(event) = events.recv().await {
        match event {
            PlaybackEvent::StateChanged { state, .. } => shared.publish(
                |now| {
                    now.state = state;
                    let reset = matches!(state, PlaybackState::Ready | PlaybackState::Idle)
                        && now.progress != 0;
                    if reset {
                        now.progress = 0;
                    }
                    reset
                },
                |observer, reset_progress| {
                    observer.on_state_changed(state);
                    if reset_progress {
                        observer.on_progress(0);
                    }
                },
            ),
            PlaybackEvent::Progress { percent, .. } => shared.publish(
                |now| now.progress = percent,
                |observer, ()| observer.on_progress(percent),
            ),
            PlaybackEvent::Failed { session, message } => {
                tracing::warn!(session, error = %message, "Playback failed");
                shared.publish(|_| {}, |observer, ()| observer.on_error(&message));
            }
        }
    }
}
