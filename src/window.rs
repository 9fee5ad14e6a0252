//! Rolling-window bookkeeping for admissions.
//!
//! [`WindowTracker`] keeps one timestamp per admission, oldest first, and answers how many
//! admissions fall inside the trailing window. It does no locking of its own; the owning
//! [`RateGate`](crate::RateGate) serializes every call behind its mutex.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Ordered record of recent admission instants.
///
/// Invariants:
/// - Records are non-decreasing from front to back.
/// - After `prune(now)`, every record has age `< window`.
/// - Nothing is swept in the background; stale records linger until the next prune.
#[derive(Debug, Clone)]
pub struct WindowTracker {
    window: Duration,
    records: VecDeque<Instant>,
}

impl WindowTracker {
    /// Create an empty tracker for the given window length.
    pub fn new(window: Duration) -> Self {
        Self { window, records: VecDeque::new() }
    }

    /// Create an empty tracker with room for `capacity` records before reallocating.
    pub fn with_capacity(window: Duration, capacity: usize) -> Self {
        Self { window, records: VecDeque::with_capacity(capacity) }
    }

    /// Window length this tracker evicts against.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Drop every record whose age at `now` is `>= window`.
    ///
    /// Records are ordered, so this trims a prefix and stops at the first record that is
    /// still inside the window.
    pub fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.records.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                self.records.pop_front();
            } else {
                break;
            }
        }
    }

    /// Number of records currently retained.
    ///
    /// Callers prune first; the gate always does.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// `true` if no admissions are retained.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append an admission at `now`.
    ///
    /// A `now` earlier than the newest record is clamped up to it so ordering holds even if
    /// callers race on reading the clock.
    pub fn record(&mut self, now: Instant) {
        let at = match self.records.back() {
            Some(&newest) if newest > now => newest,
            _ => now,
        };
        self.records.push_back(at);
    }

    /// Oldest retained admission, if any.
    pub fn oldest(&self) -> Option<Instant> {
        self.records.front().copied()
    }

    /// Instant at which the oldest retained admission ages out.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.oldest().map(|oldest| oldest + self.window)
    }
}
