//! Command handlers.
//!
//! Handlers follow the canonical pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Thin wrappers that:
//!   1. Parse/validate CLI-specific input
//!   2. Call into `readaloud-speech` / the settings service
//!   3. Format output for the terminal
//!
//! Handlers should NOT construct engines or repositories directly; the
//! [`CliContext`](crate::bootstrap::CliContext) does that.

pub mod chunks;
pub mod config;
pub mod read;
pub mod voices;
