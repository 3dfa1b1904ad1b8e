//! Typed utterance identifiers.
//!
//! Every unit of text (or silence) handed to the engine carries an
//! [`UtteranceId`] so that asynchronous started / range / finished events can
//! be correlated with what the controller asked for. The `epoch` is bumped by
//! the controller whenever it abandons the utterances already handed to the
//! engine (new session, pause, stop), so late events from an abandoned epoch
//! are recognisable as stale.
//!
//! Engines bridging to a string-keyed native API can round-trip ids through
//! [`Display`](std::fmt::Display) and [`FromStr`].
//!
//! Wire form: `title_chunk@3`, `silence@3`, `content_2@3`, `resume_0@4`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What an utterance represents within the reading session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum UtteranceKind {
    /// The story title, spoken before the body.
    Title,

    /// The fixed pause between title and body.
    Silence,

    /// Body chunk at the given index of the chunk table.
    Content(usize),

    /// First chunk(s) of a re-chunked suffix after resume.
    Resume(usize),
}

impl UtteranceKind {
    /// Chunk index for content and resume utterances.
    #[must_use]
    pub const fn chunk_index(self) -> Option<usize> {
        match self {
            Self::Content(i) | Self::Resume(i) => Some(i),
            Self::Title | Self::Silence => None,
        }
    }
}

/// Identifier of one utterance submitted to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtteranceId {
    /// Controller epoch the utterance belongs to.
    pub epoch: u64,

    /// Role of the utterance in the session.
    pub kind: UtteranceKind,
}

impl UtteranceId {
    #[must_use]
    pub const fn new(epoch: u64, kind: UtteranceKind) -> Self {
        Self { epoch, kind }
    }

    #[must_use]
    pub const fn title(epoch: u64) -> Self {
        Self::new(epoch, UtteranceKind::Title)
    }

    #[must_use]
    pub const fn silence(epoch: u64) -> Self {
        Self::new(epoch, UtteranceKind::Silence)
    }

    #[must_use]
    pub const fn content(epoch: u64, index: usize) -> Self {
        Self::new(epoch, UtteranceKind::Content(index))
    }

    #[must_use]
    pub const fn resume(epoch: u64, index: usize) -> Self {
        Self::new(epoch, UtteranceKind::Resume(index))
    }

    /// Whether range events for this utterance map onto the body text.
    #[must_use]
    pub const fn tracks_position(&self) -> bool {
        self.kind.chunk_index().is_some()
    }
}

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            UtteranceKind::Title => write!(f, "title_chunk@{}", self.epoch),
            UtteranceKind::Silence => write!(f, "silence@{}", self.epoch),
            UtteranceKind::Content(i) => write!(f, "content_{i}@{}", self.epoch),
            UtteranceKind::Resume(i) => write!(f, "resume_{i}@{}", self.epoch),
        }
    }
}

/// Error returned when a string is not a valid utterance id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid utterance id: {0:?}")]
pub struct ParseUtteranceIdError(String);

impl FromStr for UtteranceId {
    type Err = ParseUtteranceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseUtteranceIdError(s.to_owned());

        let (name, epoch) = s.rsplit_once('@').ok_or_else(invalid)?;
        let epoch: u64 = epoch.parse().map_err(|_| invalid())?;

        let kind = match name {
            "title_chunk" => UtteranceKind::Title,
            "silence" => UtteranceKind::Silence,
            _ => {
                let (prefix, index) = name.rsplit_once('_').ok_or_else(invalid)?;
                let index: usize = index.parse().map_err(|_| invalid())?;
                match prefix {
                    "content" => UtteranceKind::Content(index),
                    "resume" => UtteranceKind::Resume(index),
                    _ => return Err(invalid()),
                }
            }
        };

        Ok(Self { epoch, kind })
    }
}
