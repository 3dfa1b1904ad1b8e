//! Read command handler.
//!
//! Plays a text file through a [`PlaybackSession`] while a single status line
//! shows the state and progress. Commands typed on stdin control playback:
//!
//! | Input       | Effect                                        |
//! |-------------|-----------------------------------------------|
//! | `p`         | pause                                         |
//! | `r`         | resume (or start over after a stop)           |
//! | `s`         | stop and forget the position                  |
//! | `q`         | quit                                          |
//! | empty line  | toggle play/pause                             |

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use readaloud_core::{PlaybackObserver, PlaybackState, SessionId};
use readaloud_speech::PlaybackSession;

use crate::bootstrap::CliContext;
use crate::presentation::progress_bar;

const BAR_WIDTH: usize = 30;

// ── Status plumbing ────────────────────────────────────────────────

/// Observer callbacks, forwarded to the handler loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    State(PlaybackState),
    Progress(u8),
    Error(String),
}

struct ChannelObserver {
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl ChannelObserver {
    fn send(&self, update: StatusUpdate) {
        if self.tx.send(update).is_err() {
            tracing::debug!("Status receiver dropped");
        }
    }
}

impl PlaybackObserver for ChannelObserver {
    fn on_state_changed(&self, state: PlaybackState) {
        self.send(StatusUpdate::State(state));
    }

    fn on_progress(&self, percent: u8) {
        self.send(StatusUpdate::Progress(percent));
    }

    fn on_error(&self, message: &str) {
        self.send(StatusUpdate::Error(message.to_owned()));
    }
}

/// What the handler loop should do after a status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// Playback ended because the user asked for it.
    Stopped,
    /// The whole text was read.
    Finished,
    Failed(String),
}

/// Tracks what the status line shows and when reading is over.
#[derive(Debug, Default)]
pub struct ReadProgress {
    state: Option<PlaybackState>,
    percent: u8,
    has_played: bool,
    stop_requested: bool,
    last_error: Option<String>,
}

impl ReadProgress {
    /// The next return to `Ready` is the user's stop, not completion.
    pub const fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn apply(&mut self, update: StatusUpdate) -> Outcome {
        let state = match update {
            StatusUpdate::Progress(percent) => {
                self.percent = percent;
                return Outcome::Continue;
            }
            StatusUpdate::Error(message) => {
                self.last_error = Some(message);
                return Outcome::Continue;
            }
            StatusUpdate::State(state) => state,
        };

        self.state = Some(state);
        match state {
            PlaybackState::Playing => {
                self.has_played = true;
                self.stop_requested = false;
                Outcome::Continue
            }
            PlaybackState::Ready if self.has_played => {
                self.has_played = false;
                if std::mem::take(&mut self.stop_requested) {
                    Outcome::Stopped
                } else {
                    Outcome::Finished
                }
            }
            PlaybackState::Error => Outcome::Failed(
                self.last_error
                    .take()
                    .unwrap_or_else(|| "speech engine error".to_owned()),
            ),
            _ => Outcome::Continue,
        }
    }

    pub fn status_line(&self) -> String {
        let label = self.state.map_or("starting", PlaybackState::label);
        format!(
            "{label:<12} {} {:>3}%",
            progress_bar(self.percent, BAR_WIDTH),
            self.percent
        )
    }
}

// ── Controls ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Toggle,
    Pause,
    Resume,
    Stop,
    Quit,
}

pub fn parse_control(line: &str) -> Option<Control> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" => Some(Control::Toggle),
        "p" | "pause" => Some(Control::Pause),
        "r" | "resume" => Some(Control::Resume),
        "s" | "stop" => Some(Control::Stop),
        "q" | "quit" | "exit" => Some(Control::Quit),
        _ => None,
    }
}

/// Title used when none is given: the file stem with separators spaced out.
pub fn default_title(file: &Path) -> String {
    file.file_stem()
        .map(|stem| stem.to_string_lossy().replace(['_', '-'], " "))
        .unwrap_or_default()
}

// ── Handler ────────────────────────────────────────────────────────

/// Execute the read command.
pub async fn execute(
    ctx: &CliContext,
    file: &Path,
    title: Option<String>,
    session_id: SessionId,
) -> Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    if text.trim().is_empty() {
        println!("Nothing to read: {} is empty.", file.display());
        return Ok(());
    }

    let title = title.unwrap_or_else(|| default_title(file));
    let settings = ctx.settings().get().await?;
    let session = PlaybackSession::spawn(ctx.build_engine()?, settings)?;

    let (status_tx, status_rx) = mpsc::unbounded_channel();
    let observer: Arc<dyn PlaybackObserver> = Arc::new(ChannelObserver { tx: status_tx });
    session.register_observer(&observer);

    println!("Reading \"{title}\" from {}", file.display());
    println!("Controls: p = pause, r = resume, s = stop, q = quit, Enter = play/pause");
    session.start_reading(session_id, &title, &text);

    let reading = Reading {
        session: &session,
        session_id,
        title: &title,
        text: &text,
    };
    let result = reading.run(status_rx, spawn_input_reader()).await;

    session.shutdown();
    result
}

struct Reading<'a> {
    session: &'a PlaybackSession,
    session_id: SessionId,
    title: &'a str,
    text: &'a str,
}

impl Reading<'_> {
    async fn run(
        &self,
        mut status: mpsc::UnboundedReceiver<StatusUpdate>,
        mut input: mpsc::UnboundedReceiver<String>,
    ) -> Result<()> {
        let mut progress = ReadProgress::default();
        let mut input_open = true;
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                Some(update) = status.recv() => {
                    let outcome = progress.apply(update);
                    redraw(&progress);
                    match outcome {
                        Outcome::Continue => {}
                        Outcome::Stopped => {
                            eprintln!();
                            println!("Stopped. r = start over, q = quit");
                        }
                        Outcome::Finished => {
                            eprintln!();
                            println!("✓ Finished reading");
                            return Ok(());
                        }
                        Outcome::Failed(message) => {
                            eprintln!();
                            anyhow::bail!("Playback failed: {message}");
                        }
                    }
                }
                line = input.recv(), if input_open => match line {
                    Some(line) => {
                        if !self.apply_control(&line, &mut progress) {
                            eprintln!();
                            return Ok(());
                        }
                    }
                    None => input_open = false,
                },
                _ = &mut ctrl_c => {
                    eprintln!();
                    self.session.stop();
                    return Ok(());
                }
            }
        }
    }

    /// Apply one line of user input. Returns `false` on quit.
    fn apply_control(&self, line: &str, progress: &mut ReadProgress) -> bool {
        let Some(control) = parse_control(line) else {
            println!("Unknown command {:?} (p, r, s, q or Enter)", line.trim());
            return true;
        };

        match control {
            Control::Toggle => self
                .session
                .toggle(self.session_id, self.title, self.text),
            Control::Pause => self.session.pause(),
            Control::Resume => match self.session.current_state() {
                PlaybackState::Paused => self.session.resume(),
                PlaybackState::Ready => {
                    self.session
                        .start_reading(self.session_id, self.title, self.text);
                }
                _ => {}
            },
            Control::Stop => {
                progress.request_stop();
                self.session.stop();
            }
            Control::Quit => {
                self.session.stop();
                return false;
            }
        }
        true
    }
}

fn redraw(progress: &ReadProgress) {
    let mut stderr = std::io::stderr().lock();
    let _ = write!(stderr, "\r{}", progress.status_line());
    let _ = stderr.flush();
}

/// Forward stdin lines from a dedicated thread.
///
/// A plain thread rather than `tokio::io::stdin`, whose blocking read would
/// hold up runtime shutdown until the user pressed Enter.
fn spawn_input_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
