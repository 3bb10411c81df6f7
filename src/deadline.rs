/*!
 * Absolute Deadlines
 *
 * Deadlines are points on the realtime clock, not durations, so a caller
 * that re-waits after a spurious wake keeps the same expiry instead of
 * accumulating drift.
 */

use std::time::{Duration, Instant, SystemTime};

/// Absolute expiry time for a timed wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Deadline(SystemTime);

impl Deadline {
    /// Deadline at a fixed realtime instant
    #[inline]
    pub fn at(when: SystemTime) -> Self {
        Self(when)
    }

    /// Deadline `timeout` from now
    #[inline]
    pub fn after(timeout: Duration) -> Self {
        Self(SystemTime::now() + timeout)
    }

    /// The realtime instant this deadline expires at
    #[inline]
    pub fn when(&self) -> SystemTime {
        self.0
    }

    /// Time left until expiry (zero once expired)
    #[inline]
    pub fn remaining(&self) -> Duration {
        self.0
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO)
    }

    #[inline]
    pub fn has_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Project onto the monotonic clock for the parker.
    ///
    /// Recomputed on every park so clock steps are picked up between retries.
    #[inline]
    pub(crate) fn to_instant(self) -> Instant {
        Instant::now() + self.remaining()
    }
}

impl From<SystemTime> for Deadline {
    fn from(when: SystemTime) -> Self {
        Self::at(when)
    }
}
