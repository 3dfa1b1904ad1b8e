//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where concrete implementations are chosen
//! for the CLI adapter:
//! - Settings persistence (JSON file via [`JsonSettingsRepository`])
//! - The speech engine (`espeak-ng` process or the simulated engine)
//!
//! Command handlers receive the composed [`CliContext`] and never construct
//! engines or repositories themselves.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use readaloud_core::{SettingsService, SpeechEngine};
use readaloud_speech::{SimulatedConfig, SimulatedEngine};

use crate::parser::{Cli, EngineKind};
use crate::settings_store::{JsonSettingsRepository, resolve_settings_path};

/// Fully composed context for CLI commands.
pub struct CliContext {
    settings: SettingsService,
    settings_path: PathBuf,
    engine: EngineKind,
}

impl CliContext {
    /// Settings service over the resolved settings file.
    pub const fn settings(&self) -> &SettingsService {
        &self.settings
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub const fn engine_kind(&self) -> EngineKind {
        self.engine
    }

    /// Construct a fresh, uninitialised engine of the selected kind.
    pub fn build_engine(&self) -> Result<Box<dyn SpeechEngine>> {
        build_engine(self.engine)
    }
}

/// Bootstrap the CLI context from parsed arguments.
pub fn bootstrap(cli: &Cli) -> CliContext {
    let settings_path = resolve_settings_path(cli.config.as_deref());
    tracing::debug!(path = %settings_path.display(), engine = ?cli.engine, "Bootstrapping CLI");

    let repo = Arc::new(JsonSettingsRepository::new(settings_path.clone()));
    CliContext {
        settings: SettingsService::new(repo),
        settings_path,
        engine: cli.engine,
    }
}

/// Construct an engine of `kind`.
pub fn build_engine(kind: EngineKind) -> Result<Box<dyn SpeechEngine>> {
    match kind {
        EngineKind::Simulated => Ok(Box::new(SimulatedEngine::new(SimulatedConfig::default()))),
        #[cfg(feature = "espeak")]
        EngineKind::Espeak => Ok(Box::new(readaloud_speech::EspeakEngine::new())),
        #[cfg(not(feature = "espeak"))]
        EngineKind::Espeak => anyhow::bail!("readaloud was built without espeak-ng support"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn bootstrap_uses_explicit_config_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("speech.json");
        let cli = Cli::parse_from([
            "readaloud",
            "--engine",
            "simulated",
            "--config",
            path.to_str().unwrap(),
            "config",
            "show",
        ]);

        let ctx = bootstrap(&cli);
        assert_eq!(ctx.settings_path(), path);
        assert_eq!(ctx.engine_kind(), EngineKind::Simulated);
        assert!(ctx.build_engine().is_ok());
    }

    #[test]
    fn simulated_engine_offers_voices_before_init() {
        let engine = build_engine(EngineKind::Simulated).unwrap();
        assert!(!engine.list_voices().is_empty());
    }
}
