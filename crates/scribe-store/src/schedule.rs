//! Idle autosave timing.

use std::time::{Duration, Instant};

/// Fires once after a period without edits.
///
/// Time is passed in by the caller, so the timer never reads the clock itself.
#[derive(Debug, Clone)]
pub struct IdleTimer {
    timeout: Duration,
    last_activity: Option<Instant>,
}

impl IdleTimer {
    /// Timer that becomes due `timeout` after the last activity
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_activity: None,
        }
    }

    /// Record an edit at `now`, restarting the window
    pub fn touch(&mut self, now: Instant) {
        self.last_activity = Some(now);
    }

    /// Disarm until the next [`Self::touch`]
    pub fn reset(&mut self) {
        self.last_activity = None;
    }

    /// Whether an edit is waiting for its window to elapse
    pub fn is_armed(&self) -> bool {
        self.last_activity.is_some()
    }

    /// When the timer becomes due, if armed
    pub fn deadline(&self) -> Option<Instant> {
        self.last_activity.map(|at| at + self.timeout)
    }

    /// Whether the window has elapsed at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        self.last_activity
            .is_some_and(|at| now.saturating_duration_since(at) >= self.timeout)
    }

    /// Disarm and return `true` if due at `now`
    pub fn fire(&mut self, now: Instant) -> bool {
        let due = self.is_due(now);
        if due {
            self.reset();
        }
        due
    }
}
