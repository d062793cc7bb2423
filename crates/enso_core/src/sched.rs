//! Cooperative scheduling primitives.
//!
//! # Responsibility
//! - Provide cancellation, debouncing and per-key in-flight deduplication
//!   for hosts that drive sync and lookups from bursty UI events.
//!
//! # Invariants
//! - Cancellation is sticky: a cancelled token never reads uncancelled
//!   again, on any clone.
//! - A debouncer fires at most once per arm.
//! - [`SingleFlight::begin`] cancels the previous token under the same
//!   key before handing out a fresh one.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared flag a long-running operation polls to stop early.
///
/// Clones observe the same flag; cancelling any one cancels them all.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn shares_flag(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

/// Deadline tracker that collapses bursts of events into one firing.
///
/// Callers poke on every event and poll [`Debouncer::fire`] from their
/// tick; the deadline slides forward with each poke and fires once after
/// the quiet window passes untouched.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// Arms or re-arms the default quiet window from `now`.
    pub fn poke(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    /// Arms or re-arms with an explicit quiet window.
    pub fn poke_after(&mut self, now: Instant, quiet: Duration) {
        self.deadline = Some(now + quiet);
    }

    /// Returns true exactly once after the armed window elapses.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}

/// At-most-one in-flight operation per key.
///
/// Starting a new operation for a key cancels the token handed out for
/// the previous one, so stale responses can be recognized and dropped.
#[derive(Debug, Default)]
pub struct SingleFlight {
    inflight: BTreeMap<String, CancellationToken>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new operation for `key`, cancelling any previous one.
    pub fn begin(&mut self, key: &str) -> CancellationToken {
        if let Some(previous) = self.inflight.remove(key) {
            previous.cancel();
        }
        let token = CancellationToken::new();
        self.inflight.insert(key.to_string(), token.clone());
        token
    }

    /// Clears the slot for `key`, but only when `token` is still the
    /// current one; a superseded operation finishing late is a no-op.
    pub fn finish(&mut self, key: &str, token: &CancellationToken) {
        let current = self
            .inflight
            .get(key)
            .map(|held| held.shares_flag(token))
            .unwrap_or(false);
        if current {
            self.inflight.remove(key);
        }
    }

    pub fn in_flight(&self, key: &str) -> bool {
        self.inflight.contains_key(key)
    }
}
