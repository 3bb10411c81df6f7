/*!
 * Condvar-Based Parker
 *
 * Cross-platform fallback using parking_lot::Condvar for reliability
 */

use super::traits::ParkStrategy;
use parking_lot::{Condvar, Mutex};
use std::time::Instant;

/// Condvar-based parker
///
/// # Performance
///
/// - Slightly more overhead than futex
/// - Works on all platforms
/// - Reliable and well-tested
pub struct CondvarParker {
    /// Sticky: a waiter record is parked at most once per wait
    notified: Mutex<bool>,
    condvar: Condvar,
}

impl CondvarParker {
    pub fn new() -> Self {
        Self {
            notified: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }
}

impl Default for CondvarParker {
    fn default() -> Self {
        Self::new()
    }
}

impl ParkStrategy for CondvarParker {
    fn park(&self, should_park: &dyn Fn() -> bool, deadline: Option<Instant>) -> bool {
        let mut notified = self.notified.lock();

        loop {
            if *notified || !should_park() {
                return true;
            }

            match deadline {
                Some(deadline) => {
                    if self.condvar.wait_until(&mut notified, deadline).timed_out() {
                        return *notified || !should_park();
                    }
                }
                None => self.condvar.wait(&mut notified),
            }
        }
    }

    fn unpark(&self) {
        let mut notified = self.notified.lock();
        *notified = true;
        self.condvar.notify_all();
    }

    fn name(&self) -> &'static str {
        "condvar"
    }
}
