//! Trailing debounce
//!
//! Collapses a burst of values into the last one, released only after a
//! quiet period. The debouncer owns no timer: the event loop calls
//! [`Debouncer::poll`] (or inspects [`Debouncer::deadline`] to know when to
//! wake up), which keeps it deterministic under a manual clock.

use std::time::{Duration, Instant};

/// Holds the most recent pending value until `delay` passes without a new one
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record `value`, replacing any pending one and restarting the quiet period
    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some(Pending {
            value,
            deadline: now + self.delay,
        });
    }

    /// Drop the pending value without committing it
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending value becomes due, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Release the pending value if its quiet period has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(p) if now >= p.deadline => self.cancel(),
            _ => None,
        }
    }

    /// Release the pending value if due and hand it to `commit`
    ///
    /// Returns `true` when `commit` ran.
    pub fn poll_with(&mut self, now: Instant, commit: impl FnOnce(T)) -> bool {
        match self.poll(now) {
            Some(value) => {
                commit(value);
                true
            }
            None => false,
        }
    }

    /// Release the pending value immediately, regardless of the deadline
    pub fn flush(&mut self) -> Option<T> {
        self.cancel()
    }
}
