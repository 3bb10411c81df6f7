/*!
 * Butex Statistics
 * Process-wide lock-free counters for monitoring
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

static STATS: ButexStats = ButexStats::new();

/// Atomic butex statistics for lock-free updates
///
/// # Performance
/// - Cache-line aligned to prevent false sharing with neighbouring statics
/// - Relaxed increments only; hot paths never synchronize through here
#[repr(C, align(64))]
pub(crate) struct ButexStats {
    heap_live: AtomicUsize,
    waits: AtomicU64,
    value_mismatches: AtomicU64,
    woken: AtomicU64,
    timeouts: AtomicU64,
    interrupts: AtomicU64,
    requeued: AtomicU64,
}

impl ButexStats {
    const fn new() -> Self {
        Self {
            heap_live: AtomicUsize::new(0),
            waits: AtomicU64::new(0),
            value_mismatches: AtomicU64::new(0),
            woken: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            interrupts: AtomicU64::new(0),
            requeued: AtomicU64::new(0),
        }
    }

    /// Get snapshot of current stats (no locks required)
    ///
    /// # Note
    /// Values may not be perfectly consistent with each other due to concurrent updates,
    /// but each individual value is accurate. This is acceptable for monitoring.
    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            heap_live: self.heap_live.load(Ordering::Relaxed),
            waits: self.waits.load(Ordering::Relaxed),
            value_mismatches: self.value_mismatches.load(Ordering::Relaxed),
            woken: self.woken.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            interrupts: self.interrupts.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Heap-owned butexes not yet freed
    pub heap_live: usize,
    /// Wait calls that got past the entry checks
    pub waits: u64,
    pub value_mismatches: u64,
    /// Waiters resumed by a wake-family call
    pub woken: u64,
    pub timeouts: u64,
    pub interrupts: u64,
    /// Waiters migrated by requeue
    pub requeued: u64,
}

/// Snapshot the process-wide counters
pub fn snapshot() -> StatsSnapshot {
    STATS.snapshot()
}

#[inline(always)]
pub(crate) fn heap_created() {
    STATS.heap_live.fetch_add(1, Ordering::Relaxed);
}

#[inline(always)]
pub(crate) fn heap_freed() {
    STATS.heap_live.fetch_sub(1, Ordering::Relaxed);
}

#[inline(always)]
pub(crate) fn wait_started() {
    STATS.waits.fetch_add(1, Ordering::Relaxed);
}

#[inline(always)]
pub(crate) fn value_mismatch() {
    STATS.value_mismatches.fetch_add(1, Ordering::Relaxed);
}

#[inline(always)]
pub(crate) fn woken(count: usize) {
    STATS.woken.fetch_add(count as u64, Ordering::Relaxed);
}

#[inline(always)]
pub(crate) fn timed_out() {
    STATS.timeouts.fetch_add(1, Ordering::Relaxed);
}

#[inline(always)]
pub(crate) fn interrupted() {
    STATS.interrupts.fetch_add(1, Ordering::Relaxed);
}

#[inline(always)]
pub(crate) fn requeued(count: usize) {
    STATS.requeued.fetch_add(count as u64, Ordering::Relaxed);
}
