/*!
 * Wait Queue
 *
 * Per-butex FIFO of waiter records behind a short-held lock.
 *
 * # Invariants
 *
 * - A record is `Queued` exactly while its `container` points at the queue
 *   that holds it; both change together, under that queue's lock.
 * - A record sits in at most one queue. Requeue holds both locks while it
 *   moves records, so no observer sees a record in both or in neither.
 * - The lock is never held while a context is suspended.
 */

use crate::context::ContextId;
use crate::park::{ParkStrategy, Parker};
use arc_swap::ArcSwapOption;
use parking_lot::{Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Lifecycle of one waiter record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum WaiterStatus {
    Queued = 0,
    Woken = 1,
    TimedOut = 2,
    Interrupted = 3,
}

impl WaiterStatus {
    #[inline]
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WaiterStatus::Queued,
            1 => WaiterStatus::Woken,
            2 => WaiterStatus::TimedOut,
            _ => WaiterStatus::Interrupted,
        }
    }
}

/// One suspended context
pub(crate) struct WaiterNode {
    ctx: ContextId,
    /// Enqueue order within the current queue
    seq: AtomicU64,
    status: AtomicU8,
    /// Back-reference used by erase and reparented by requeue
    container: ArcSwapOption<WaitQueue>,
    parker: Parker,
}

impl WaiterNode {
    pub(crate) fn new(ctx: ContextId, parker: Parker) -> Self {
        Self {
            ctx,
            seq: AtomicU64::new(0),
            status: AtomicU8::new(WaiterStatus::Queued as u8),
            container: ArcSwapOption::empty(),
            parker,
        }
    }

    #[inline]
    pub(crate) fn ctx(&self) -> ContextId {
        self.ctx
    }

    #[inline]
    pub(crate) fn seq(&self) -> u64 {
        self.seq.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn status(&self) -> WaiterStatus {
        WaiterStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn is_queued(&self) -> bool {
        self.status() == WaiterStatus::Queued
    }

    /// Suspend the owning context until the status leaves `Queued`
    #[inline]
    pub(crate) fn park(&self, deadline: Option<Instant>) -> bool {
        self.parker.park(&|| self.is_queued(), deadline)
    }

    #[inline]
    pub(crate) fn unpark(&self) {
        self.parker.unpark();
    }

    fn belongs_to(&self, queue: &Arc<WaitQueue>) -> bool {
        match &*self.container.load() {
            Some(current) => Arc::ptr_eq(current, queue),
            None => false,
        }
    }

    /// Settle and detach; caller holds the lock of the current container.
    ///
    /// Status goes first: anyone who sees no container must also see a
    /// settled status.
    fn finish(&self, status: WaiterStatus) {
        self.status.store(status as u8, Ordering::Release);
        self.container.store(None);
    }
}

/// Queue shared by a butex and the records parked on it
pub(crate) struct WaitQueue {
    list: Mutex<WaitList>,
}

impl WaitQueue {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            list: Mutex::new(WaitList::new()),
        })
    }

    #[inline]
    pub(crate) fn lock(&self) -> MutexGuard<'_, WaitList> {
        self.list.lock()
    }

    pub(crate) fn len(&self) -> usize {
        self.list.lock().len()
    }
}

/// Records in enqueue order
pub(crate) struct WaitList {
    waiters: VecDeque<Arc<WaiterNode>>,
    next_seq: u64,
}

impl WaitList {
    fn new() -> Self {
        Self {
            waiters: VecDeque::new(),
            next_seq: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Append a record; `owner` must be the queue this list belongs to
    pub(crate) fn push_back(&mut self, owner: &Arc<WaitQueue>, node: Arc<WaiterNode>) {
        node.seq.store(self.next_seq, Ordering::Relaxed);
        self.next_seq += 1;
        node.container.store(Some(Arc::clone(owner)));
        self.waiters.push_back(node);
    }

    /// Remove the earliest record and settle it with `status`
    pub(crate) fn pop_front(&mut self, status: WaiterStatus) -> Option<Arc<WaiterNode>> {
        let node = self.waiters.pop_front()?;
        node.finish(status);
        Some(node)
    }

    /// Remove and settle every record, leaving the one owned by `excluded` queued
    pub(crate) fn drain(
        &mut self,
        status: WaiterStatus,
        excluded: Option<ContextId>,
    ) -> Vec<Arc<WaiterNode>> {
        let mut taken = Vec::with_capacity(self.waiters.len());
        let mut kept = VecDeque::new();

        for node in self.waiters.drain(..) {
            if excluded == Some(node.ctx()) {
                kept.push_back(node);
            } else {
                node.finish(status);
                taken.push(node);
            }
        }

        self.waiters = kept;
        taken
    }

    /// Remove a specific record and settle it; false if it is not here
    pub(crate) fn remove(&mut self, node: &Arc<WaiterNode>, status: WaiterStatus) -> bool {
        match self.waiters.iter().position(|n| Arc::ptr_eq(n, node)) {
            Some(index) => {
                self.waiters.remove(index);
                node.finish(status);
                true
            }
            None => false,
        }
    }

    /// Move every record to the tail of `dest`, preserving order.
    ///
    /// Caller holds both locks. Returns the number moved.
    pub(crate) fn splice_into(&mut self, dest: &mut WaitList, dest_owner: &Arc<WaitQueue>) -> usize {
        let moved = self.waiters.len();
        for node in self.waiters.drain(..) {
            dest.push_back(dest_owner, node);
        }
        moved
    }

    #[cfg(test)]
    pub(crate) fn contexts(&self) -> Vec<ContextId> {
        self.waiters.iter().map(|n| n.ctx()).collect()
    }
}

/// Lock two distinct queues in address order; guards come back as `(a, b)`
pub(crate) fn lock_pair<'a>(
    a: &'a WaitQueue,
    b: &'a WaitQueue,
) -> (MutexGuard<'a, WaitList>, MutexGuard<'a, WaitList>) {
    if (a as *const WaitQueue) < (b as *const WaitQueue) {
        let guard_a = a.lock();
        let guard_b = b.lock();
        (guard_a, guard_b)
    } else {
        let guard_b = b.lock();
        let guard_a = a.lock();
        (guard_a, guard_b)
    }
}

/// Remove `node` from whichever queue currently holds it.
///
/// Returns false if the record was already settled (woken, timed out or
/// interrupted by someone else). Retries when a concurrent requeue moves the
/// record between reading the back-reference and taking the lock.
pub(crate) fn erase(node: &Arc<WaiterNode>, status: WaiterStatus) -> bool {
    loop {
        let Some(queue) = node.container.load_full() else {
            return false;
        };

        let mut list = queue.lock();
        if !node.belongs_to(&queue) {
            continue;
        }
        return list.remove(node, status);
    }
}
