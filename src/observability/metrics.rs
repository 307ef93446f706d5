//! Atom metrics
//!
//! - Counters only
//! - Monotonic increase
//! - Shareable between atoms through `Arc`

use std::sync::atomic::{AtomicU64, Ordering};

/// Operational counters for one or more atoms.
///
/// Relaxed ordering throughout; counters are advisory.
#[derive(Debug, Default)]
pub struct AtomMetrics {
    hydrations: AtomicU64,
    hydration_failures: AtomicU64,
    recoveries: AtomicU64,
    backups_created: AtomicU64,
    backups_failed: AtomicU64,
    writes_succeeded: AtomicU64,
    writes_failed: AtomicU64,
    writes_retried: AtomicU64,
    writes_superseded: AtomicU64,
    sets_suppressed: AtomicU64,
    sets_rejected: AtomicU64,
}

/// Point-in-time copy of [`AtomMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub hydrations: u64,
    pub hydration_failures: u64,
    pub recoveries: u64,
    pub backups_created: u64,
    pub backups_failed: u64,
    pub writes_succeeded: u64,
    pub writes_failed: u64,
    pub writes_retried: u64,
    pub writes_superseded: u64,
    pub sets_suppressed: u64,
    pub sets_rejected: u64,
}

impl AtomMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_hydrations(&self) {
        self.hydrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_hydration_failures(&self) {
        self.hydration_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_recoveries(&self) {
        self.recoveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_backups_created(&self) {
        self.backups_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_backups_failed(&self) {
        self.backups_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_writes_succeeded(&self) {
        self.writes_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_writes_failed(&self) {
        self.writes_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_writes_retried(&self) {
        self.writes_retried.fetch_add(1, Ordering::Relaxed);
    }

    /// A scheduled write was skipped because a newer value was already persisted
    pub fn increment_writes_superseded(&self) {
        self.writes_superseded.fetch_add(1, Ordering::Relaxed);
    }

    /// A `set` was a no-op because the equality check matched
    pub fn increment_sets_suppressed(&self) {
        self.sets_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sets_rejected(&self) {
        self.sets_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hydrations: self.hydrations.load(Ordering::Relaxed),
            hydration_failures: self.hydration_failures.load(Ordering::Relaxed),
            recoveries: self.recoveries.load(Ordering::Relaxed),
            backups_created: self.backups_created.load(Ordering::Relaxed),
            backups_failed: self.backups_failed.load(Ordering::Relaxed),
            writes_succeeded: self.writes_succeeded.load(Ordering::Relaxed),
            writes_failed: self.writes_failed.load(Ordering::Relaxed),
            writes_retried: self.writes_retried.load(Ordering::Relaxed),
            writes_superseded: self.writes_superseded.load(Ordering::Relaxed),
            sets_suppressed: self.sets_suppressed.load(Ordering::Relaxed),
            sets_rejected: self.sets_rejected.load(Ordering::Relaxed),
        }
    }
}
