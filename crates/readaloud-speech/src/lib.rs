//! Speech playback for readaloud.
//!
//! Reads long-form text aloud through a [`SpeechEngine`](readaloud_core::SpeechEngine):
//!
//! - [`chunking`] splits text into engine-sized pieces and finds natural
//!   restart points for resume.
//! - [`EngineAdapter`] owns the engine handle and buffers commands until the
//!   engine is ready.
//! - [`SpeechController`] is the playback state machine (title, pause,
//!   chunks, pause/resume, progress).
//! - [`PlaybackSession`] hosts a controller on a tokio task and relays its
//!   state to a [`PlaybackObserver`](readaloud_core::PlaybackObserver).
//! - [`engine`] holds the bundled engines.

#![deny(unused_crate_dependencies)]

pub mod adapter;
pub mod chunking;
pub mod controller;
pub mod engine;
pub mod error;
pub mod session;

pub use adapter::{EngineAdapter, preferred_voices};
pub use chunking::{Chunk, natural_break_before, split_chars, split_into_chunks};
pub use controller::SpeechController;
#[cfg(feature = "espeak")]
pub use engine::EspeakEngine;
pub use engine::{SimulatedConfig, SimulatedEngine};
pub use error::SpeechError;
pub use session::{NowPlaying, PlaybackSession, SessionCommand};

#[cfg(test)]
use tokio_test as _;
