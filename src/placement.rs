/*!
 * Placement Butexes
 *
 * In-place construction over caller-owned memory. The caller keeps the
 * bytes; this module only builds and tears down the butex living in them.
 *
 * `destruct` needs `&mut ButexMemory`, so the borrow checker rejects it
 * while any `ButexRef` is still in use, and a `ButexRef` has no heap
 * teardown to call by mistake.
 */

use crate::butex::ButexCore;
use crate::config::SyncConfig;
use log::debug;
use std::fmt;
use std::ops::Deref;
use std::sync::OnceLock;

/// Required in-place footprint of a placement butex
pub const BUTEX_MEMORY_SIZE: usize = std::mem::size_of::<ButexMemory>();

/// Caller-owned storage for one placement butex
///
/// # Examples
///
/// ```
/// use butex::ButexMemory;
///
/// let mut memory = ButexMemory::new();
/// {
///     let butex = memory.construct();
///     butex.store(3);
///     assert_eq!(memory.locate().map(|b| b.load()), Some(3));
/// }
/// memory.destruct();
/// assert!(memory.locate().is_none());
/// ```
#[repr(C, align(64))]
pub struct ButexMemory {
    slot: OnceLock<ButexCore>,
}

impl ButexMemory {
    /// Empty storage; nothing is constructed yet
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// Construct a butex in place using the process-wide configuration.
    ///
    /// Constructing over memory that already holds a butex returns that butex.
    pub fn construct(&self) -> ButexRef<'_> {
        self.construct_with(SyncConfig::global())
    }

    /// Construct a butex in place with an explicit configuration
    pub fn construct_with(&self, config: SyncConfig) -> ButexRef<'_> {
        let core = self.slot.get_or_init(|| {
            debug!("Placement butex constructed at {:p}", self);
            ButexCore::new(config)
        });
        ButexRef { core }
    }

    /// The butex living in this memory, if one has been constructed
    #[inline]
    pub fn locate(&self) -> Option<ButexRef<'_>> {
        self.slot.get().map(|core| ButexRef { core })
    }

    /// Tear the butex down in place. The memory itself stays with the caller
    /// and may be constructed over again.
    pub fn destruct(&mut self) {
        if let Some(core) = self.slot.take() {
            debug!("Placement butex destructed at {:p}", self);
            drop(core);
        }
    }

    #[inline]
    pub fn is_constructed(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl Default for ButexMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ButexMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButexMemory")
            .field("butex", &self.slot.get())
            .finish()
    }
}

/// Borrowed handle to a placement butex
#[derive(Clone, Copy)]
pub struct ButexRef<'a> {
    core: &'a ButexCore,
}

impl<'a> ButexRef<'a> {
    /// The shared representation, with the full borrow lifetime
    #[inline]
    pub fn core(self) -> &'a ButexCore {
        self.core
    }
}

impl Deref for ButexRef<'_> {
    type Target = ButexCore;

    #[inline]
    fn deref(&self) -> &ButexCore {
        self.core
    }
}

impl fmt::Debug for ButexRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ButexRef").field(self.core).finish()
    }
}
