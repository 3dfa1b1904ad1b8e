//! Bundled [`SpeechEngine`](readaloud_core::SpeechEngine) implementations.
//!
//! - [`SimulatedEngine`]: timer-paced, silent; always available.
//! - [`EspeakEngine`]: drives the `espeak-ng` executable (feature `espeak`).

#[cfg(feature = "espeak")]
pub mod espeak;
mod queue;
pub mod simulated;

#[cfg(feature = "espeak")]
pub use espeak::EspeakEngine;
pub use simulated::{SimulatedConfig, SimulatedEngine};
