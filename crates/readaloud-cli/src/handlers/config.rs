//! Config command handler.
//!
//! Shows and updates the persisted speech settings.

use anyhow::Result;
use readaloud_core::{SettingsChange, SpeechSettings, SpeechSettingsUpdate};

use crate::bootstrap::CliContext;
use crate::commands::ConfigCommand;
use crate::presentation::format_optional;

/// Execute the config command.
pub async fn execute(ctx: &CliContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show { json } => {
            let settings = ctx.settings().get().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                println!("Settings file: {}", ctx.settings_path().display());
                print_settings(&settings);
            }
        }
        ConfigCommand::Set {
            rate,
            pitch,
            voice,
            default_voice,
            languages,
            max_chunk_chars,
            title_pause_ms,
            resume_lookback_chars,
        } => {
            let voice = if default_voice {
                Some(None)
            } else {
                voice.map(Some)
            };
            let update = SpeechSettingsUpdate {
                rate,
                pitch,
                voice,
                languages,
                max_chunk_chars,
                title_pause_ms,
                resume_lookback_chars,
            };

            if is_empty_update(&update) {
                println!("No settings provided. Use --help to see available options.");
                return Ok(());
            }

            // Validation happens in the service before anything is written
            let change = ctx.settings().update(update).await?;
            print_change(&change);
        }
        ConfigCommand::Reset => {
            let defaults = ctx.settings().reset().await?;
            println!("✓ Settings reset to defaults:");
            print_settings(&defaults);
        }
    }
    Ok(())
}

const fn is_empty_update(update: &SpeechSettingsUpdate) -> bool {
    update.rate.is_none()
        && update.pitch.is_none()
        && update.voice.is_none()
        && update.languages.is_none()
        && update.max_chunk_chars.is_none()
        && update.title_pause_ms.is_none()
        && update.resume_lookback_chars.is_none()
}

fn print_change(change: &SettingsChange) {
    if change.is_unchanged() {
        println!("Settings already have these values; nothing written.");
        return;
    }

    let fields: Vec<_> = change.changed.iter().map(|f| f.name()).collect();
    println!("✓ Updated {}:", fields.join(", "));
    print_settings(&change.settings);
    if change.needs_new_session() {
        println!();
        println!("Chunking, title pause and language changes apply from the next reading.");
    }
}

fn print_settings(settings: &SpeechSettings) {
    println!("  rate:                  {}", settings.rate);
    println!("  pitch:                 {}", settings.pitch);
    println!(
        "  voice:                 {}",
        format_optional(settings.voice.as_ref(), "(engine default)")
    );
    println!("  languages:             {}", settings.languages.join(", "));
    println!("  max_chunk_chars:       {}", settings.max_chunk_chars);
    println!("  title_pause_ms:        {}", settings.title_pause_ms);
    println!("  resume_lookback_chars: {}", settings.resume_lookback_chars);
}
