/*!
 * Lifetime Bridge
 *
 * Lets a waker keep a heap-owned butex alive across a wake that may race
 * with `destroy`. A pin is one extra strong reference: the memory is freed
 * exactly once, by whichever release drops the count to zero.
 */

use crate::butex::{release, Butex, HeapCell};
use log::debug;
use std::fmt;
use std::sync::Arc;

/// A pinned heap butex, obtained from [`Butex::pin_before_wake`]
///
/// Dropping a pin without calling one of its methods unpins it.
pub struct PinnedButex {
    cell: Option<Arc<HeapCell>>,
}

impl Butex {
    /// Pin this butex so a concurrent `destroy` cannot free it mid-wake
    pub fn pin_before_wake(&self) -> PinnedButex {
        PinnedButex {
            cell: Some(Arc::clone(&self.cell)),
        }
    }
}

impl PinnedButex {
    /// Wake at most one waiter, then unpin. Returns the number woken.
    pub fn wake_and_unpin(self) -> usize {
        self.wake_then_unpin(|butex| butex.wake())
    }

    /// Wake every waiter, then unpin. Returns the number woken.
    pub fn wake_all_and_unpin(self) -> usize {
        self.wake_then_unpin(|butex| butex.wake_all())
    }

    /// Unpin without waking. Returns true iff this call freed the butex.
    pub fn unpin(mut self) -> bool {
        self.cell.take().is_some_and(unpin_cell)
    }

    fn wake_then_unpin(mut self, wake: impl FnOnce(&Butex) -> usize) -> usize {
        let Some(cell) = self.cell.take() else {
            return 0;
        };
        let butex = Butex { cell };
        let woken = wake(&butex);
        unpin_cell(butex.cell);
        woken
    }
}

fn unpin_cell(cell: Arc<HeapCell>) -> bool {
    let freed = release(cell);
    if freed {
        debug!("Last pin released; heap butex freed");
    }
    freed
}

impl Drop for PinnedButex {
    fn drop(&mut self) {
        if let Some(cell) = self.cell.take() {
            unpin_cell(cell);
        }
    }
}

impl fmt::Debug for PinnedButex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedButex")
            .field("pinned", &self.cell.is_some())
            .finish()
    }
}
