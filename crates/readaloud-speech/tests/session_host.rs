//! Integration tests for `PlaybackSession`, the task that hosts a
//! controller.
//!
//! The host runs on the test's tokio runtime; the scripted engine's events
//! are injected through its recorder and the tests yield until the owner task
//! and event bridge have caught up.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{Call, EngineRecorder, ScriptedEngine};
use readaloud_core::{
    EngineEvent, NO_SESSION, PlaybackObserver, PlaybackState, SpeechSettings, UtteranceKind,
};
use readaloud_speech::{PlaybackSession, SessionCommand};

// ── Recording observer ─────────────────────────────────────────────

#[derive(Default)]
struct RecordingObserver {
    states: Mutex<Vec<PlaybackState>>,
    progress: Mutex<Vec<u8>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn states(&self) -> Vec<PlaybackState> {
        self.states.lock().unwrap().clone()
    }

    fn progress(&self) -> Vec<u8> {
        self.progress.lock().unwrap().clone()
    }
}

impl PlaybackObserver for RecordingObserver {
    fn on_state_changed(&self, state: PlaybackState) {
        self.states.lock().unwrap().push(state);
    }

    fn on_progress(&self, percent: u8) {
        self.progress.lock().unwrap().push(percent);
    }

    fn on_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

/// Blocks inside its first state callback, so whatever the host does next
/// lands while registration is still delivering.
#[derive(Default)]
struct SlowFirstObserver {
    inner: RecordingObserver,
    delayed: AtomicBool,
}

impl PlaybackObserver for SlowFirstObserver {
    fn on_state_changed(&self, state: PlaybackState) {
        if !self.delayed.swap(true, Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(50));
        }
        self.inner.on_state_changed(state);
    }

    fn on_progress(&self, percent: u8) {
        self.inner.on_progress(percent);
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Yield until `condition` holds, failing after a bounded number of turns.
async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

/// Let queued commands and events run through both host tasks.
async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Poll `condition` on wall-clock time, for tests on the multi-thread
/// runtime where yielding does not guarantee the other tasks ran.
async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached");
}

async fn ready_session() -> (PlaybackSession, EngineRecorder) {
    let (engine, recorder) = ScriptedEngine::new();
    let session = PlaybackSession::spawn(Box::new(engine), SpeechSettings::default()).unwrap();
    assert!(recorder.was_initialized());
    recorder.emit(EngineEvent::Ready);
    eventually(|| session.current_state() == PlaybackState::Ready).await;
    (session, recorder)
}

fn observe(session: &PlaybackSession) -> Arc<RecordingObserver> {
    let observer = Arc::new(RecordingObserver::default());
    let as_dyn: Arc<dyn PlaybackObserver> = observer.clone();
    session.register_observer(&as_dyn);
    observer
}

// ── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn registration_delivers_current_state_immediately() {
    let (session, _recorder) = ready_session().await;
    let observer = observe(&session);
    assert_eq!(observer.states(), vec![PlaybackState::Ready]);
    assert_eq!(observer.progress(), vec![0]);
}

#[tokio::test]
async fn reregistration_replaces_the_observer() {
    let (session, recorder) = ready_session().await;
    let first = observe(&session);
    let second = observe(&session);

    session.start_reading(1, "", "Body.");
    eventually(|| second.states().contains(&PlaybackState::Playing)).await;
    assert_eq!(first.states(), vec![PlaybackState::Ready]);
    assert_eq!(recorder.spoken_texts(), vec!["Body."]);
}

#[tokio::test]
async fn dropped_observer_is_released() {
    let (session, _recorder) = ready_session().await;
    let observer = observe(&session);
    drop(observer);

    session.start_reading(1, "", "Body.");
    eventually(|| session.current_state() == PlaybackState::Playing).await;

    session.unregister_observer();
    session.stop();
    eventually(|| session.current_state() == PlaybackState::Ready).await;
}

#[tokio::test]
async fn progress_is_reset_when_reading_finishes() {
    let (session, recorder) = ready_session().await;
    let observer = observe(&session);

    session.start_reading(5, "Title", "Short body.");
    assert_eq!(session.current_session_id(), 5);
    eventually(|| recorder.last_utterance().is_some()).await;

    let title = recorder.last_utterance().unwrap();
    recorder.emit(EngineEvent::UtteranceFinished { id: title });
    eventually(|| {
        recorder
            .last_utterance()
            .is_some_and(|id| id.kind == UtteranceKind::Content(0))
    })
    .await;

    let body = recorder.last_utterance().unwrap();
    recorder.emit(EngineEvent::RangeStart {
        id: body,
        char_start: 6,
        char_end: 10,
    });
    eventually(|| session.now_playing().progress == 55).await;

    recorder.emit(EngineEvent::UtteranceFinished { id: body });
    eventually(|| session.current_state() == PlaybackState::Ready).await;
    settle().await;

    let now = session.now_playing();
    assert_eq!(now.progress, 0);
    // Natural completion keeps the bookkeeping.
    assert_eq!(now.session_id, 5);
    assert_eq!(now.title, "Title");
    assert!(!now.is_ongoing());

    assert_eq!(
        observer.states(),
        vec![
            PlaybackState::Ready,
            PlaybackState::Playing,
            PlaybackState::Ready
        ]
    );
    assert_eq!(observer.progress().last(), Some(&0));
    assert!(observer.progress().contains(&55));
}

#[tokio::test]
async fn stop_clears_bookkeeping() {
    let (session, _recorder) = ready_session().await;
    session.start_reading(3, "Story", "Body.");
    eventually(|| session.now_playing().is_ongoing()).await;
    assert_eq!(session.now_playing().title, "Story");

    session.stop();
    assert_eq!(session.current_session_id(), NO_SESSION);
    eventually(|| session.current_state() == PlaybackState::Ready).await;
    assert!(session.now_playing().title.is_empty());
}

#[tokio::test]
async fn toggle_pauses_resumes_and_switches_sessions() {
    let (session, recorder) = ready_session().await;

    session.toggle(1, "", "First story.");
    eventually(|| session.current_state() == PlaybackState::Playing).await;

    session.toggle(1, "", "First story.");
    eventually(|| session.current_state() == PlaybackState::Paused).await;

    session.toggle(1, "", "First story.");
    eventually(|| session.current_state() == PlaybackState::Playing).await;
    assert_eq!(
        recorder.last_utterance().map(|id| id.kind),
        Some(UtteranceKind::Resume(0))
    );

    session.toggle(2, "", "Second story.");
    eventually(|| recorder.spoken_texts().last().map(String::as_str) == Some("Second story."))
        .await;
    assert_eq!(session.current_session_id(), 2);
}

#[tokio::test]
async fn engine_errors_reach_the_observer() {
    let (session, recorder) = ready_session().await;
    let observer = observe(&session);
    session.start_reading(4, "", "Body.");
    eventually(|| recorder.last_utterance().is_some()).await;

    let id = recorder.last_utterance().unwrap();
    recorder.emit(EngineEvent::Error {
        id,
        message: "audio device lost".to_string(),
    });
    eventually(|| session.current_state() == PlaybackState::Error).await;
    settle().await;

    let errors = observer.errors.lock().unwrap().clone();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("audio device lost"));
    assert_eq!(session.current_session_id(), 4);
}

#[tokio::test]
async fn configure_reaches_the_engine() {
    let (session, recorder) = ready_session().await;
    session.command(SessionCommand::Configure {
        rate: 1.5,
        pitch: 0.9,
        voice: Some("en-voice".to_string()),
    });
    eventually(|| recorder.calls().contains(&Call::Voice(Some("en-voice".to_string())))).await;
    assert!(recorder.calls().contains(&Call::Rate(1.5)));
}

#[tokio::test]
async fn shutdown_releases_the_engine() {
    let (session, recorder) = ready_session().await;
    session.shutdown();
    eventually(|| recorder.calls().contains(&Call::Shutdown)).await;
    eventually(|| session.is_closed()).await;

    // Commands after shutdown are dropped quietly.
    session.start_reading(9, "", "ignored");
    settle().await;
    assert!(recorder.spoken_texts().is_empty());
}

#[tokio::test]
async fn dropping_the_handle_shuts_down() {
    let (session, recorder) = ready_session().await;
    drop(session);
    eventually(|| recorder.calls().contains(&Call::Shutdown)).await;
}

#[test]
fn commands_queue_before_the_engine_is_ready() {
    tokio_test::block_on(async {
        let (engine, recorder) = ScriptedEngine::new();
        let session = PlaybackSession::spawn(Box::new(engine), SpeechSettings::default()).unwrap();
        session.start_reading(1, "Early", "Body.");
        settle().await;
        assert!(recorder.spoken_texts().is_empty());
        assert_eq!(session.current_state(), PlaybackState::Initializing);

        recorder.emit(EngineEvent::Ready);
        eventually(|| recorder.spoken_texts() == vec!["Early"]).await;
    });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn registration_racing_a_transition_ends_on_the_latest_state() {
    let (engine, recorder) = ScriptedEngine::new();
    let session =
        Arc::new(PlaybackSession::spawn(Box::new(engine), SpeechSettings::default()).unwrap());
    recorder.emit(EngineEvent::Ready);
    wait_for(|| session.current_state() == PlaybackState::Ready).await;
    let observer = Arc::new(SlowFirstObserver::default());

    let registering = {
        let session = Arc::clone(&session);
        let as_dyn: Arc<dyn PlaybackObserver> = observer.clone();
        tokio::task::spawn_blocking(move || session.register_observer(&as_dyn))
    };
    session.start_reading(1, "", "Body.");
    registering.await.unwrap();

    wait_for(|| observer.inner.states().contains(&PlaybackState::Playing)).await;

    assert_eq!(session.current_state(), PlaybackState::Playing);
    assert_eq!(
        observer.inner.states().last(),
        Some(&PlaybackState::Playing)
    );
    assert_eq!(recorder.spoken_texts(), vec!["Body."]);
}
