//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::commands::Commands;

/// Command-line interface definition for the read-aloud tool.
///
/// This is the top-level parser that handles global options and dispatches
/// to subcommands.
#[derive(Parser)]
#[command(name = "readaloud")]
#[command(about = "Read text files aloud with pause and resume")]
#[command(version)]
pub struct Cli {
    /// Settings file to use instead of the platform default
    #[arg(long = "config", global = true, env = "READALOUD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Speech engine to drive
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = EngineKind::default(),
        env = "READALOUD_ENGINE"
    )]
    pub engine: EngineKind,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available synthesis backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    /// The `espeak-ng` executable
    Espeak,
    /// Timer-driven engine without audio output
    Simulated,
}

impl Default for EngineKind {
    fn default() -> Self {
        if cfg!(feature = "espeak") {
            Self::Espeak
        } else {
            Self::Simulated
        }
    }
}
