//! Playback observer port.

use crate::state::PlaybackState;

/// Presentation-layer listener for playback state and progress.
///
/// Observers receive plain copies of the latest values; they never hold
/// controller state. Callbacks may arrive on a runtime worker thread, so
/// implementations must be `Send + Sync` and should not block.
pub trait PlaybackObserver: Send + Sync {
    /// The playback state changed (also delivered once on registration).
    fn on_state_changed(&self, state: PlaybackState);

    /// Reading position changed (0–100).
    fn on_progress(&self, percent: u8);

    /// A session failed; `on_state_changed(Error)` follows.
    fn on_error(&self, message: &str) {
        let _ = message;
    }
}

/// An observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PlaybackObserver for NoopObserver {
    fn on_state_changed(&self, _state: PlaybackState) {}

    fn on_progress(&self, _percent: u8) {}
}
