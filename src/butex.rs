/*!
 * Butex
 *
 * A futex-like 32-bit word with its own wait queue. `ButexCore` is the one
 * runtime representation; it is reached either through a heap-owned
 * `Butex` (shared, reference counted) or through a placement `ButexRef`
 * borrowed from caller-owned `ButexMemory`.
 *
 * # Performance
 *
 * - Cache-line aligned so the value word never shares a line with
 *   unrelated data
 * - Wake-family calls hold the queue lock for O(k) in the waiters touched
 */

use crate::config::SyncConfig;
use crate::deadline::Deadline;
use crate::errors::WaitResult;
use crate::park::Parker;
use crate::queue::WaitQueue;
use crate::stats;
use log::{debug, warn};
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Shared runtime representation of a butex
#[repr(C, align(64))]
pub struct ButexCore {
    pub(crate) value: AtomicU32,
    pub(crate) queue: Arc<WaitQueue>,
    pub(crate) config: SyncConfig,
}

impl ButexCore {
    pub(crate) fn new(config: SyncConfig) -> Self {
        Self {
            value: AtomicU32::new(0),
            queue: WaitQueue::new(),
            config,
        }
    }

    /// The raw value word. Its read/modify/write discipline belongs to the caller.
    #[inline]
    pub fn word(&self) -> &AtomicU32 {
        &self.value
    }

    #[inline]
    pub fn load(&self) -> u32 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn store(&self, value: u32) {
        self.value.store(value, Ordering::Release);
    }

    /// Add to the value word, returning the previous value
    #[inline]
    pub fn fetch_add(&self, delta: u32) -> u32 {
        self.value.fetch_add(delta, Ordering::AcqRel)
    }

    #[inline]
    pub fn compare_exchange(&self, current: u32, new: u32) -> Result<u32, u32> {
        self.value
            .compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire)
    }

    /// Number of waiters currently queued (diagnostic, racy)
    pub fn waiter_count(&self) -> usize {
        self.queue.len()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Name of the parking strategy new waiters will use
    pub fn strategy_name(&self) -> &'static str {
        Parker::name_for(&self.config)
    }

    #[inline]
    pub(crate) fn same_queue(&self, other: &ButexCore) -> bool {
        Arc::ptr_eq(&self.queue, &other.queue)
    }
}

impl Drop for ButexCore {
    fn drop(&mut self) {
        let queued = self.queue.len();
        if queued > 0 {
            warn!("Butex torn down with {} waiter(s) still queued", queued);
        }
    }
}

impl fmt::Debug for ButexCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButexCore")
            .field("value", &self.load())
            .field("waiters", &self.waiter_count())
            .field("strategy", &self.strategy_name())
            .finish()
    }
}

/// Heap allocation behind a `Butex`; counted in stats while alive
pub(crate) struct HeapCell {
    core: ButexCore,
}

impl Drop for HeapCell {
    fn drop(&mut self) {
        stats::heap_freed();
        debug!("Heap butex {:p} freed", &self.core);
    }
}

/// Drop one strong reference; true iff this call freed the butex
pub(crate) fn release(cell: Arc<HeapCell>) -> bool {
    Arc::into_inner(cell).is_some()
}

/// Heap-owned butex handle
///
/// Cloning shares ownership; the backing memory is freed exactly once, by
/// whichever handle (or pin) is released last.
///
/// # Examples
///
/// ```
/// use butex::{Butex, WaitError};
///
/// let butex = Butex::create();
/// butex.store(1);
///
/// // Value already changed: the wait returns at once
/// assert_eq!(butex.wait(0, None), Err(WaitError::ValueMismatch));
/// assert_eq!(butex.wake(), 0);
/// assert!(butex.destroy());
/// ```
#[derive(Clone)]
pub struct Butex {
    pub(crate) cell: Arc<HeapCell>,
}

impl Butex {
    /// Allocate a butex using the process-wide configuration
    pub fn create() -> Self {
        Self::with_config(SyncConfig::global())
    }

    /// Allocate a butex with an explicit configuration
    pub fn with_config(config: SyncConfig) -> Self {
        let cell = Arc::new(HeapCell {
            core: ButexCore::new(config),
        });
        stats::heap_created();
        debug!(
            "Heap butex {:p} created ({})",
            &cell.core,
            Parker::name_for(&config)
        );
        Self { cell }
    }

    /// Allocate a butex viewed as `T`, which must be exactly 32 bits wide
    pub fn create_typed<T: ButexWord>() -> TypedButex<T> {
        TypedButex::new(Self::create())
    }

    /// Give up this handle. Returns true iff this call freed the butex.
    ///
    /// Any other outstanding handle or pin keeps the butex alive, so a
    /// destroy racing a pinned wake can never free memory under it.
    pub fn destroy(self) -> bool {
        release(self.cell)
    }

    /// Current number of owning handles and pins (diagnostic)
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.cell)
    }

    /// True if both handles own the same butex
    pub fn ptr_eq(a: &Butex, b: &Butex) -> bool {
        Arc::ptr_eq(&a.cell, &b.cell)
    }
}

impl Deref for Butex {
    type Target = ButexCore;

    #[inline]
    fn deref(&self) -> &ButexCore {
        &self.cell.core
    }
}

impl fmt::Debug for Butex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Butex").field(&**self).finish()
    }
}

/// A 32-bit type that can live in a butex value word
pub trait ButexWord: Copy {
    fn to_bits(self) -> u32;
    fn from_bits(bits: u32) -> Self;
}

impl ButexWord for u32 {
    #[inline]
    fn to_bits(self) -> u32 {
        self
    }

    #[inline]
    fn from_bits(bits: u32) -> Self {
        bits
    }
}

impl ButexWord for i32 {
    #[inline]
    fn to_bits(self) -> u32 {
        self as u32
    }

    #[inline]
    fn from_bits(bits: u32) -> Self {
        bits as i32
    }
}

/// Heap-owned butex whose value word is read and written as `T`
pub struct TypedButex<T: ButexWord> {
    butex: Butex,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ButexWord> TypedButex<T> {
    fn new(butex: Butex) -> Self {
        const {
            assert!(
                std::mem::size_of::<T>() == std::mem::size_of::<u32>(),
                "butex word type must be exactly 32 bits wide"
            )
        };
        Self {
            butex,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn load(&self) -> T {
        T::from_bits(self.butex.load())
    }

    #[inline]
    pub fn store(&self, value: T) {
        self.butex.store(value.to_bits());
    }

    pub fn wait(&self, expected: T, deadline: Option<Deadline>) -> WaitResult {
        self.butex.wait(expected.to_bits(), deadline)
    }

    pub fn wait_uninterruptible(&self, expected: T, deadline: Option<Deadline>) -> WaitResult {
        self.butex.wait_uninterruptible(expected.to_bits(), deadline)
    }

    pub fn wake(&self) -> usize {
        self.butex.wake()
    }

    pub fn wake_all(&self) -> usize {
        self.butex.wake_all()
    }

    /// The untyped handle, for requeue and the lifetime bridge
    pub fn as_butex(&self) -> &Butex {
        &self.butex
    }

    pub fn into_butex(self) -> Butex {
        self.butex
    }
}

impl<T: ButexWord> Clone for TypedButex<T> {
    fn clone(&self) -> Self {
        Self {
            butex: self.butex.clone(),
            _marker: PhantomData,
        }
    }
}
