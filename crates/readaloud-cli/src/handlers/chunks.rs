//! Chunks command handler.
//!
//! Shows the utterance table the controller would build for a file, which
//! is handy when tuning `max_chunk_chars`.

use std::path::Path;

use anyhow::{Context, Result};
use readaloud_speech::{Chunk, split_into_chunks};

use crate::bootstrap::CliContext;
use crate::presentation::{preview, print_separator};

const PREVIEW_CHARS: usize = 48;

/// Execute the chunks command.
pub async fn execute(
    ctx: &CliContext,
    file: &Path,
    max_chars: Option<usize>,
    json: bool,
) -> Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let max_chars = match max_chars {
        Some(0) => anyhow::bail!("--max-chars must be at least 1"),
        Some(n) => n,
        None => ctx.settings().get().await?.max_chunk_chars,
    };

    let chunks = split_into_chunks(&text, max_chars);
    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
    } else {
        print_table(&chunks, text.chars().count(), max_chars);
    }
    Ok(())
}

fn print_table(chunks: &[Chunk], total_chars: usize, max_chars: usize) {
    if chunks.is_empty() {
        println!("No speakable text.");
        return;
    }

    println!(
        "{:<5} {:>8} {:>8} {:>6}  Preview",
        "#", "Start", "End", "Chars"
    );
    print_separator(80);
    for (index, chunk) in chunks.iter().enumerate() {
        println!(
            "{:<5} {:>8} {:>8} {:>6}  {}",
            index,
            chunk.start,
            chunk.end(),
            chunk.char_len(),
            preview(&chunk.text, PREVIEW_CHARS)
        );
    }
    print_separator(80);
    println!(
        "{} chunk(s), {} characters, at most {} per chunk",
        chunks.len(),
        total_chars,
        max_chars
    );
}
