/*!
 * Parking Traits
 *
 * The seam between the butex and whatever actually suspends an execution
 * context. One parker belongs to exactly one waiter record, so `unpark`
 * never has to pick a victim: it resumes the owner of this parker.
 */

use std::time::Instant;

/// Strategy for suspending a single waiter
///
/// Implementations must be:
/// - **Thread-safe**: `unpark` may race with `park` from another thread
/// - **Lossless**: an `unpark` issued after `should_park` turned false must
///   not leave the waiter suspended
///
/// `park` may return spuriously; callers re-check their own state and park
/// again when needed.
pub trait ParkStrategy: Send + Sync {
    /// Suspend until unparked, `should_park` returns false, or `deadline` passes
    ///
    /// `should_park` is evaluated while holding the parker's own lock, so it
    /// must be cheap and must not call back into the parker.
    ///
    /// Returns `false` only if the deadline elapsed.
    fn park(&self, should_park: &dyn Fn() -> bool, deadline: Option<Instant>) -> bool;

    /// Resume the waiter suspended on this parker (no-op if none)
    fn unpark(&self);

    /// Get strategy name for debugging
    fn name(&self) -> &'static str;
}
