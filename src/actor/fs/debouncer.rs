use std::time::{Duration, Instant};

/// Leading-edge debounce window.
///
/// The first change after a quiet period is accepted and starts a new
/// window; every change inside that window is dropped. Timestamps come from
/// the watcher thread, so time spent in a rebuild cycle does not stretch the
/// window.
pub(super) struct Debouncer {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Replace the window length (after a config reload).
    pub(super) fn set_window(&mut self, window: Duration) {
        self.window = window;
    }

    /// Whether a change observed at `at` starts a new window.
    pub(super) fn accept_at(&mut self, at: Instant) -> bool {
        if let Some(last) = self.last_accepted
            && at.saturating_duration_since(last) < self.window
        {
            return false;
        }
        self.last_accepted = Some(at);
        true
    }
}
