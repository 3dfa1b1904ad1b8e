//! CLI entry point - the composition root.
//!
//! Logging is set up here, then the context is bootstrapped and the command
//! dispatched to its handler.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use readaloud_cli::{Cli, Commands, bootstrap, handlers};

/// Install the `fmt` subscriber. `RUST_LOG` wins; otherwise `-v` selects
/// debug output and the default stays quiet so the status line is readable.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = bootstrap(&cli);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Read {
            file,
            title,
            session,
        } => {
            handlers::read::execute(&ctx, &file, title, session).await?;
        }
        Commands::Chunks {
            file,
            max_chars,
            json,
        } => {
            handlers::chunks::execute(&ctx, &file, max_chars, json).await?;
        }
        Commands::Voices { all, json } => {
            handlers::voices::execute(&ctx, all, json).await?;
        }
        Commands::Config { command } => {
            handlers::config::execute(&ctx, command).await?;
        }
    }

    Ok(())
}
