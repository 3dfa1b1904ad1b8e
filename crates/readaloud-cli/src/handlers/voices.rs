//! Voices command handler.
//!
//! Initialises the selected engine just long enough to list its voices.

use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::mpsc;

use readaloud_core::{EngineEvent, EngineEventSender, VoiceDescriptor};
use readaloud_speech::EngineAdapter;

use crate::bootstrap::CliContext;
use crate::presentation::print_separator;

/// How long to wait for the engine to report readiness.
const READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Execute the voices command.
///
/// By default only voices for the first preferred language are shown
/// (falling back to all voices when the engine has none for it).
pub async fn execute(ctx: &CliContext, all: bool, json: bool) -> Result<()> {
    let settings = ctx.settings().get().await?;
    let mut adapter = EngineAdapter::new(ctx.build_engine()?);

    let (events, mut rx) = EngineEventSender::channel();
    adapter.initialize(events);
    tokio::time::timeout(READY_TIMEOUT, wait_until_ready(&mut rx))
        .await
        .map_err(|_| anyhow!("Speech engine did not become ready within {READY_TIMEOUT:?}"))?
        .map_err(|reason| anyhow!("Speech engine unavailable: {reason}"))?;

    let language = adapter.mark_ready(&settings.languages);
    let voices = if all {
        adapter.list_voices()
    } else {
        adapter.preferred_voices(&settings.languages)
    };
    adapter.release();

    if json {
        println!("{}", serde_json::to_string_pretty(&voices)?);
        return Ok(());
    }

    print_voices(&voices, settings.voice.as_deref());
    match language {
        Some(locale) => println!("Speaking language: {locale}"),
        None => println!("None of the preferred languages are supported; using engine default."),
    }
    Ok(())
}

async fn wait_until_ready(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) -> Result<(), String> {
    while let Some(event) = rx.recv().await {
        match event {
            EngineEvent::Ready => return Ok(()),
            EngineEvent::InitFailed { reason } => return Err(reason),
            other => tracing::debug!(event = ?other, "Ignoring event during voice listing"),
        }
    }
    Err("engine stopped before becoming ready".to_owned())
}

fn print_voices(voices: &[VoiceDescriptor], selected: Option<&str>) {
    if voices.is_empty() {
        println!("The engine offers no voices.");
        return;
    }

    println!("  {:<32} Locale", "Name");
    print_separator(48);
    for voice in voices {
        let marker = if selected == Some(voice.name.as_str()) {
            '*'
        } else {
            ' '
        };
        println!("{marker} {:<32} {}", voice.name, voice.locale);
    }
    if selected.is_some() {
        println!();
        println!("* = configured voice");
    }
}
