//! Main commands enum and primary subcommands.
//!
//! This module defines the available commands for the CLI tool.

use std::path::PathBuf;

use clap::Subcommand;

/// Available commands for the read-aloud tool.
#[derive(Subcommand)]
pub enum Commands {
    /// Read a text file aloud (p = pause, r = resume, s = stop, q = quit)
    Read {
        /// Text file to read
        file: PathBuf,
        /// Title spoken before the body (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,
        /// Session identifier reported with playback events
        #[arg(long, default_value_t = 1)]
        session: u64,
    },

    /// Show how a text file is split into engine utterances
    Chunks {
        /// Text file to split
        file: PathBuf,
        /// Override the maximum characters per chunk
        #[arg(long)]
        max_chars: Option<usize>,
        /// Print the chunk table as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the voices offered by the speech engine
    Voices {
        /// Include voices for every language, not just the preferred one
        #[arg(long)]
        all: bool,
        /// Print the voice list as JSON
        #[arg(long)]
        json: bool,
    },

    /// View or change speech settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Settings command variants.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the current speech settings
    Show {
        /// Print the settings as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update speech settings
    Set {
        /// Speech rate multiplier (0.5-2.0)
        #[arg(long)]
        rate: Option<f32>,
        /// Pitch multiplier (0.5-2.0)
        #[arg(long)]
        pitch: Option<f32>,
        /// Voice name (see `readaloud voices`)
        #[arg(long, conflicts_with = "default_voice")]
        voice: Option<String>,
        /// Go back to the engine's default voice
        #[arg(long)]
        default_voice: bool,
        /// Preferred languages, most preferred first (e.g. vi-VN,en-US)
        #[arg(long, value_delimiter = ',')]
        languages: Option<Vec<String>>,
        /// Maximum characters per utterance (>= 1)
        #[arg(long)]
        max_chunk_chars: Option<usize>,
        /// Silence between title and body, in milliseconds
        #[arg(long)]
        title_pause_ms: Option<u64>,
        /// Characters searched backwards for a resume boundary
        #[arg(long)]
        resume_lookback_chars: Option<usize>,
    },
    /// Reset all settings to defaults
    Reset,
}
