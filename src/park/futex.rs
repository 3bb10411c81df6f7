/*!
 * Futex-Based Parker
 *
 * Uses parking_lot_core for futex-like operations on all platforms.
 * On Linux, this maps directly to futex syscalls for minimal overhead.
 *
 * # Design
 *
 * Each waiter record owns one parker and the parker's address is the
 * parking key, so a wake never touches unrelated waiters. The validate
 * callback runs under parking_lot's bucket lock, which is what closes the
 * window between "waiter decided to sleep" and "waker flipped the status".
 */

use super::traits::ParkStrategy;
use parking_lot_core::{park, unpark_all, ParkResult, DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Futex-based parker keyed on its own address
///
/// # Performance
///
/// - Zero allocations
/// - Direct futex syscalls on Linux
/// - O(1) wake: one key, at most one sleeper
pub struct FutexParker {
    /// Threads currently inside `park` (diagnostics; also gives the key a real address)
    sleepers: AtomicUsize,
}

impl FutexParker {
    pub const fn new() -> Self {
        Self {
            sleepers: AtomicUsize::new(0),
        }
    }

    #[inline]
    fn key(&self) -> usize {
        &self.sleepers as *const AtomicUsize as usize
    }

    /// Number of threads currently parked here
    pub fn sleepers(&self) -> usize {
        self.sleepers.load(Ordering::Relaxed)
    }
}

impl Default for FutexParker {
    fn default() -> Self {
        Self::new()
    }
}

impl ParkStrategy for FutexParker {
    fn park(&self, should_park: &dyn Fn() -> bool, deadline: Option<Instant>) -> bool {
        self.sleepers.fetch_add(1, Ordering::Relaxed);

        // SAFETY: the key is the address of a field we own for the whole call,
        // and none of the callbacks panic or call back into parking_lot.
        let result = unsafe {
            park(
                self.key(),
                || should_park(),
                || {},
                |_key, _was_last| {},
                DEFAULT_PARK_TOKEN,
                deadline,
            )
        };

        self.sleepers.fetch_sub(1, Ordering::Relaxed);

        match result {
            ParkResult::Unparked(_) => true,
            ParkResult::Invalid => true, // State already changed, nothing to sleep on
            ParkResult::TimedOut => false,
        }
    }

    fn unpark(&self) {
        // SAFETY: same key as `park`; no callbacks.
        unsafe {
            unpark_all(self.key(), DEFAULT_UNPARK_TOKEN);
        }
    }

    fn name(&self) -> &'static str {
        "futex"
    }
}
