//! Coalescing timer for draft writes.
//!
//! Every state change reschedules the write; only the newest snapshot is
//! written, and only after the window has passed without further changes.
//! The owner drives it with `poll` from its event loop.

use std::time::{Duration, Instant};

use crate::wizard::WizardState;

#[derive(Debug)]
struct Pending {
    snapshot: WizardState,
    due: Instant,
}

#[derive(Debug)]
pub struct DraftDebouncer {
    window: Duration,
    pending: Option<Pending>,
}

impl DraftDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace any pending snapshot and restart the quiet period
    pub fn schedule(&mut self, snapshot: WizardState, now: Instant) {
        self.pending = Some(Pending {
            snapshot,
            due: now + self.window,
        });
    }

    /// The pending snapshot, if its quiet period has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<WizardState> {
        if self.pending.as_ref().is_some_and(|p| now >= p.due) {
            self.pending.take().map(|p| p.snapshot)
        } else {
            None
        }
    }

    /// Take the pending snapshot without waiting
    pub fn flush(&mut self) -> Option<WizardState> {
        self.pending.take().map(|p| p.snapshot)
    }

    /// Drop the pending snapshot. Returns whether one was dropped.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }
}
