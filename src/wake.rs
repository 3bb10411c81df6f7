/*!
 * Wake Engine
 *
 * Pop-and-mark under the queue lock, unpark after releasing it. None of
 * these calls block or yield: they return as soon as the lock is dropped,
 * and the woken contexts resume asynchronously.
 */

use crate::butex::ButexCore;
use crate::context::ContextId;
use crate::queue::{self, WaiterNode, WaiterStatus};
use crate::stats;
use log::trace;
use std::sync::Arc;

impl ButexCore {
    /// Wake the earliest-queued waiter, if any.
    ///
    /// Returns the number of waiters woken (0 or 1).
    pub fn wake(&self) -> usize {
        let node = self.queue.lock().pop_front(WaiterStatus::Woken);

        match node {
            Some(node) => {
                trace!("Woke context {} (seq {})", node.ctx(), node.seq());
                node.unpark();
                stats::woken(1);
                1
            }
            None => 0,
        }
    }

    /// Wake every waiter currently queued.
    ///
    /// Returns the number of waiters woken.
    pub fn wake_all(&self) -> usize {
        let woken = self.queue.lock().drain(WaiterStatus::Woken, None);
        resume_all(woken)
    }

    /// Wake every waiter except the one running as `excluded`.
    ///
    /// Never yields the calling context, so it is safe on paths that must
    /// not be rescheduled. Returns the number of waiters woken.
    pub fn wake_except(&self, excluded: ContextId) -> usize {
        let woken = self.queue.lock().drain(WaiterStatus::Woken, Some(excluded));
        resume_all(woken)
    }

    /// Wake at most one waiter here and move all the others to the tail of
    /// `target`, preserving their order.
    ///
    /// Both queues are locked for the whole move, so every waiter present
    /// when the call starts is either woken or migrated, never both. Returns
    /// the number woken on this butex (0 or 1); migrated waiters are not counted.
    pub fn requeue(&self, target: &ButexCore) -> usize {
        if self.same_queue(target) {
            return self.wake();
        }

        let (woken, moved) = {
            let (mut source, mut dest) = queue::lock_pair(&self.queue, &target.queue);
            let woken = source.pop_front(WaiterStatus::Woken);
            let moved = source.splice_into(&mut dest, &target.queue);
            (woken, moved)
        };

        if moved > 0 {
            trace!("Requeued {} waiter(s)", moved);
            stats::requeued(moved);
        }

        match woken {
            Some(node) => {
                trace!("Woke context {} before requeue", node.ctx());
                node.unpark();
                stats::woken(1);
                1
            }
            None => 0,
        }
    }
}

fn resume_all(woken: Vec<Arc<WaiterNode>>) -> usize {
    let count = woken.len();
    for node in &woken {
        node.unpark();
    }
    if count > 0 {
        trace!("Woke {} waiter(s)", count);
        stats::woken(count);
    }
    count
}
