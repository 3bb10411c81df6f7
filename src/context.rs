/*!
 * Execution Contexts
 *
 * Identity and cooperative cancellation for waiters.
 *
 * A `Context` is what a wait is performed *as*: it names the waiter (so
 * `wake_except` can skip it) and carries the stop flag that cancellation is
 * raised against. OS threads get one lazily through `Context::current()`;
 * an M:N scheduler creates one per lightweight task with `Context::new()`.
 */

use crate::queue::{self, WaiterNode, WaiterStatus};
use log::trace;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: Context = Context::new();
}

/// Execution context identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(pub u64);

impl ContextId {
    #[inline]
    fn next() -> Self {
        ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ContextInner {
    id: ContextId,
    stopped: AtomicBool,
    /// Record of the interruptible wait in progress, if any
    parked: Mutex<Option<Arc<WaiterNode>>>,
}

/// Handle to an execution context (cheap to clone, shareable across threads)
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Create a detached context with a fresh identifier
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id: ContextId::next(),
                stopped: AtomicBool::new(false),
                parked: Mutex::new(None),
            }),
        }
    }

    /// Context of the calling thread
    pub fn current() -> Self {
        CURRENT.with(Context::clone)
    }

    #[inline]
    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    /// Raise a stop request against this context.
    ///
    /// An interruptible wait in progress returns `Interrupted` right away;
    /// an uninterruptible one keeps waiting and reports `Interrupted` when it
    /// ends. The request stays raised until `clear_stop`.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);

        // Take under the slot lock, erase outside it
        let parked = self.inner.parked.lock().take();
        if let Some(node) = parked {
            if queue::erase(&node, WaiterStatus::Interrupted) {
                trace!("Context {} interrupted while parked", self.id());
                node.unpark();
            }
        }
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Withdraw a previously raised stop request
    pub fn clear_stop(&self) {
        self.inner.stopped.store(false, Ordering::SeqCst);
    }

    /// Publish the record of an interruptible wait so `stop` can reach it.
    ///
    /// Callers must re-check `is_stopped` afterwards: a stop that took the
    /// slot before this call is only visible through the flag.
    pub(crate) fn register(&self, node: &Arc<WaiterNode>) {
        *self.inner.parked.lock() = Some(Arc::clone(node));
    }

    pub(crate) fn unregister(&self, node: &Arc<WaiterNode>) {
        let mut parked = self.inner.parked.lock();
        if parked.as_ref().is_some_and(|p| Arc::ptr_eq(p, node)) {
            *parked = None;
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
