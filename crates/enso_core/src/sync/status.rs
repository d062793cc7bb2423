//! UI-facing sync indicator.
//!
//! # Responsibility
//! - Track the coarse indicator a host renders next to the capture box:
//!   idle, pending (a local change is settling) or conflict (attention
//!   required).
//!
//! # Invariants
//! - A capture that lands while another change is still settling flags a
//!   conflict instead of quietly piling up.
//! - Conflict is sticky: only an explicit resolve or a successful sync
//!   leaves it.

use std::time::{Duration, Instant};

use crate::sched::Debouncer;

/// Quiet window after a capture before the indicator settles.
pub const CAPTURE_SETTLE: Duration = Duration::from_millis(1400);

/// Quiet window after an edit, link change or delete.
pub const EDIT_SETTLE: Duration = Duration::from_millis(900);

/// Quiet window after an explicit conflict resolve.
pub const RESOLVE_SETTLE: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncIndicator {
    Idle,
    Pending,
    Conflict,
}

/// Which local operation produced a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationSource {
    Capture,
    Edit,
}

/// State machine behind the indicator. Hosts call
/// [`SyncStatusTracker::tick`] from their frame or timer loop.
#[derive(Debug)]
pub struct SyncStatusTracker {
    indicator: SyncIndicator,
    settle: Debouncer,
}

impl SyncStatusTracker {
    pub fn new() -> Self {
        Self {
            indicator: SyncIndicator::Idle,
            settle: Debouncer::new(EDIT_SETTLE),
        }
    }

    pub fn indicator(&self) -> SyncIndicator {
        self.indicator
    }

    /// Records a local mutation at `now`.
    pub fn mark_mutation(&mut self, source: MutationSource, now: Instant) {
        if self.indicator == SyncIndicator::Pending && source == MutationSource::Capture {
            self.indicator = SyncIndicator::Conflict;
            self.settle.cancel();
            return;
        }

        self.indicator = SyncIndicator::Pending;
        let quiet = match source {
            MutationSource::Capture => CAPTURE_SETTLE,
            MutationSource::Edit => EDIT_SETTLE,
        };
        self.settle.poke_after(now, quiet);
    }

    /// Advances the machine; a pending indicator settles to idle once
    /// its quiet window passes.
    pub fn tick(&mut self, now: Instant) -> SyncIndicator {
        if self.settle.fire(now) && self.indicator == SyncIndicator::Pending {
            self.indicator = SyncIndicator::Idle;
        }
        self.indicator
    }

    /// Acknowledges a conflict, moving back through pending.
    pub fn resolve(&mut self, now: Instant) {
        self.indicator = SyncIndicator::Pending;
        self.settle.poke_after(now, RESOLVE_SETTLE);
    }

    /// A sync run failed; the indicator demands attention until resolved.
    pub fn mark_failure(&mut self) {
        self.indicator = SyncIndicator::Conflict;
        self.settle.cancel();
    }

    /// A sync run succeeded; everything is settled.
    pub fn mark_synced(&mut self) {
        self.indicator = SyncIndicator::Idle;
        self.settle.cancel();
    }
}

impl Default for SyncStatusTracker {
    fn default() -> Self {
        Self::new()
    }
}
