/*!
 * Wait Engine
 *
 * Value check and enqueue happen under the queue lock, which is the same
 * lock every wake-family call pops under. A waiter that saw the old value
 * is therefore already queued when the next wake runs, and a waiter that
 * runs after the mutation sees the new value and never parks.
 *
 * Parking happens only after the lock is released.
 */

use crate::butex::ButexCore;
use crate::context::Context;
use crate::deadline::Deadline;
use crate::errors::{WaitError, WaitResult};
use crate::park::Parker;
use crate::queue::{self, WaiterNode, WaiterStatus};
use crate::stats;
use log::trace;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitMode {
    /// A stop request resumes the waiter immediately
    Interruptible,
    /// A stop request only annotates the outcome
    Uninterruptible,
}

impl ButexCore {
    /// Wait as the calling thread's context. See [`ButexCore::wait_in`].
    pub fn wait(&self, expected: u32, deadline: Option<Deadline>) -> WaitResult {
        self.wait_in(&Context::current(), expected, deadline)
    }

    /// Atomically check the value and, if it still equals `expected`, park
    /// `ctx` until woken, until `deadline`, or until `ctx` is stopped.
    ///
    /// # Errors
    ///
    /// - `ValueMismatch`: the value already differs; nothing was queued
    /// - `Timeout`: the deadline passed first
    /// - `Interrupted`: `ctx` was stopped before or during the wait
    pub fn wait_in(&self, ctx: &Context, expected: u32, deadline: Option<Deadline>) -> WaitResult {
        self.wait_impl(ctx, expected, deadline, WaitMode::Interruptible)
    }

    /// Wait as the calling thread's context. See [`ButexCore::wait_uninterruptible_in`].
    pub fn wait_uninterruptible(&self, expected: u32, deadline: Option<Deadline>) -> WaitResult {
        self.wait_uninterruptible_in(&Context::current(), expected, deadline)
    }

    /// Like [`ButexCore::wait_in`], but a stop request does not end the wait.
    ///
    /// Only a wake or the deadline resumes the waiter. If `ctx` is stopped
    /// when the wait ends, the result is `Interrupted` instead of success or
    /// `Timeout`, so the caller still learns about the request.
    pub fn wait_uninterruptible_in(
        &self,
        ctx: &Context,
        expected: u32,
        deadline: Option<Deadline>,
    ) -> WaitResult {
        self.wait_impl(ctx, expected, deadline, WaitMode::Uninterruptible)
    }

    fn wait_impl(
        &self,
        ctx: &Context,
        expected: u32,
        deadline: Option<Deadline>,
        mode: WaitMode,
    ) -> WaitResult {
        if mode == WaitMode::Interruptible && ctx.is_stopped() {
            return settle(ctx, mode, Err(WaitError::Interrupted));
        }

        let node = Arc::new(WaiterNode::new(ctx.id(), Parker::for_config(&self.config)));
        {
            let mut list = self.queue.lock();
            if self.value.load(Ordering::Acquire) != expected {
                stats::value_mismatch();
                return Err(WaitError::ValueMismatch);
            }
            if deadline.is_some_and(|d| d.has_expired()) {
                drop(list);
                return settle(ctx, mode, Err(WaitError::Timeout));
            }
            list.push_back(&self.queue, Arc::clone(&node));
        }
        stats::wait_started();
        trace!("Context {} waiting (seq {})", ctx.id(), node.seq());

        if mode == WaitMode::Interruptible {
            ctx.register(&node);
            if ctx.is_stopped() {
                queue::erase(&node, WaiterStatus::Interrupted);
            }
        }

        while node.is_queued() {
            if let Some(deadline) = deadline {
                if deadline.has_expired() {
                    queue::erase(&node, WaiterStatus::TimedOut);
                    break;
                }
            }
            node.park(deadline.map(Deadline::to_instant));
        }

        if mode == WaitMode::Interruptible {
            ctx.unregister(&node);
        }

        let outcome = match node.status() {
            WaiterStatus::Woken => Ok(()),
            WaiterStatus::TimedOut => Err(WaitError::Timeout),
            WaiterStatus::Interrupted => Err(WaitError::Interrupted),
            // `WaiterNode::finish` publishes the status before it detaches the
            // record, so a failed erase always leaves a settled status behind
            WaiterStatus::Queued => unreachable!("waiter left the park loop while queued"),
        };

        settle(ctx, mode, outcome)
    }
}

/// Decide the outcome reported to the caller and count it exactly once
fn settle(ctx: &Context, mode: WaitMode, outcome: WaitResult) -> WaitResult {
    let outcome = annotate(ctx, mode, outcome);
    match outcome {
        Err(WaitError::Timeout) => stats::timed_out(),
        Err(WaitError::Interrupted) => stats::interrupted(),
        _ => {}
    }
    outcome
}

/// Uninterruptible waits report a pending stop in place of their own outcome
fn annotate(ctx: &Context, mode: WaitMode, outcome: WaitResult) -> WaitResult {
    if mode == WaitMode::Uninterruptible && ctx.is_stopped() {
        trace!("Context {} finished waiting with a stop pending", ctx.id());
        return Err(WaitError::Interrupted);
    }
    outcome
}
