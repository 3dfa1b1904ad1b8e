//! Command-line adapter for readaloud.
//!
//! Reads text files aloud through `readaloud-speech`, with interactive
//! pause/resume, and manages the persisted speech settings.
//!
//! ```text
//! readaloud read story.txt --title "Chapter One"
//! readaloud chunks story.txt --max-chars 500
//! readaloud voices --all
//! readaloud config set --rate 1.25 --languages vi-VN,en-US
//! ```

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tokio_test as _;

// Used by the binary only
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod handlers;
pub mod parser;
pub mod presentation;
pub mod settings_store;

// Re-export primary types for convenient access
pub use bootstrap::{CliContext, bootstrap};
pub use commands::{Commands, ConfigCommand};
pub use parser::{Cli, EngineKind};
pub use settings_store::{JsonSettingsRepository, resolve_settings_path};
