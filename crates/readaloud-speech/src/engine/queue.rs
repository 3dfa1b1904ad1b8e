//! Utterance queue worker shared by the bundled engines.
//!
//! The worker runs as a tokio task and owns the utterance queue. It reports
//! `started` before and `finished` after each utterance. An utterance cut
//! short by `stop` or by a replacing utterance also reports `finished`.
//! How an utterance is actually voiced is left to a [`Performer`].

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;

use readaloud_core::{EngineEvent, EngineEventSender, QueueMode, UtteranceId};

/// Synthesis parameters captured when an utterance is queued.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VoiceParams {
    pub rate: f32,
    pub pitch: f32,
    /// Explicit voice, or the selected language when no voice is set.
    pub voice: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Utterance {
    Text(String),
    Silence(Duration),
}

#[derive(Debug, Clone)]
pub(crate) struct Queued {
    pub id: UtteranceId,
    pub utterance: Utterance,
    pub params: VoiceParams,
}

#[derive(Debug)]
pub(crate) enum WorkerCommand {
    Enqueue { item: Queued, mode: QueueMode },
    Stop,
    Shutdown,
}

/// Voices one utterance. Dropping the returned future must silence it.
pub(crate) trait Performer: Send + 'static {
    fn perform<'a>(
        &'a mut self,
        item: &'a Queued,
        events: &'a EngineEventSender,
    ) -> impl Future<Output = Result<(), String>> + Send + 'a;
}

enum Outcome {
    Completed(Result<(), String>),
    Interrupted,
    Shutdown,
}

/// Run the queue until shutdown or until every command sender is gone.
pub(crate) async fn run_worker<P: Performer>(
    mut commands: mpsc::UnboundedReceiver<WorkerCommand>,
    events: EngineEventSender,
    mut performer: P,
) {
    let mut queue: VecDeque<Queued> = VecDeque::new();

    loop {
        let Some(item) = queue.pop_front() else {
            match commands.recv().await {
                Some(WorkerCommand::Enqueue { item, mode }) => {
                    if mode == QueueMode::Replace {
                        queue.clear();
                    }
                    queue.push_back(item);
                }
                Some(WorkerCommand::Stop) => queue.clear(),
                Some(WorkerCommand::Shutdown) | None => return,
            }
            continue;
        };

        events.emit(EngineEvent::UtteranceStarted { id: item.id });

        let outcome = {
            let perform = performer.perform(&item, &events);
            tokio::pin!(perform);
            loop {
                tokio::select! {
                    result = &mut perform => break Outcome::Completed(result),
                    command = commands.recv() => match command {
                        Some(WorkerCommand::Enqueue { item: next, mode: QueueMode::Append }) => {
                            queue.push_back(next);
                        }
                        Some(WorkerCommand::Enqueue { item: next, mode: QueueMode::Replace }) => {
                            queue.clear();
                            queue.push_back(next);
                            break Outcome::Interrupted;
                        }
                        Some(WorkerCommand::Stop) => {
                            queue.clear();
                            break Outcome::Interrupted;
                        }
                        Some(WorkerCommand::Shutdown) | None => break Outcome::Shutdown,
                    },
                }
            }
        };

        match outcome {
            Outcome::Completed(Ok(())) | Outcome::Interrupted => {
                events.emit(EngineEvent::UtteranceFinished { id: item.id });
            }
            Outcome::Completed(Err(message)) => {
                tracing::warn!(id = %item.id, error = %message, "Utterance failed");
                events.emit(EngineEvent::Error {
                    id: item.id,
                    message,
                });
            }
            Outcome::Shutdown => return,
        }
    }
}

/// Char-offset spans of the whitespace-separated words in `text`.
pub(crate) fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    let mut count = 0;
    for (i, c) in text.chars().enumerate() {
        match (c.is_whitespace(), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                spans.push((s, i));
                start = None;
            }
            _ => {}
        }
        count = i + 1;
    }
    if let Some(s) = start {
        spans.push((s, count));
    }
    spans
}
