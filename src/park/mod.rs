/*!
 * Parking Strategies
 *
 * Interchangeable ways to suspend one waiter record:
 * - Futex-based (parking_lot_core, fastest)
 * - Condvar-based (cross-platform, reliable)
 * - Spinwait-based (low-latency, high-CPU)
 *
 * # Design: Enum Dispatch
 *
 * Each waiter record carries its own `Parker`, chosen from the butex
 * configuration at enqueue time. A waiter migrated to another butex by
 * requeue is still resumed through the parker it actually sleeps on.
 */

mod condvar;
mod futex;
mod spinwait;
mod traits;

pub use condvar::CondvarParker;
pub use futex::FutexParker;
pub use spinwait::SpinParker;
pub use traits::ParkStrategy;

use crate::config::{StrategyType, SyncConfig};
use std::time::Instant;

/// Parker implementation (enum dispatch, no vtable on the hot path)
pub(crate) enum Parker {
    Futex(FutexParker),
    Condvar(CondvarParker),
    SpinWait(SpinParker),
}

impl Parker {
    pub(crate) fn for_config(config: &SyncConfig) -> Self {
        match config.select_strategy() {
            StrategyType::Futex | StrategyType::Auto => Parker::Futex(FutexParker::new()),
            StrategyType::Condvar => Parker::Condvar(CondvarParker::new()),
            StrategyType::SpinWait => {
                Parker::SpinWait(SpinParker::new(config.spin_duration, config.max_spins))
            }
        }
    }

    /// Name of the parker a config resolves to, without building one
    pub(crate) fn name_for(config: &SyncConfig) -> &'static str {
        match config.select_strategy() {
            StrategyType::Futex | StrategyType::Auto => "futex",
            StrategyType::Condvar => "condvar",
            StrategyType::SpinWait => "spinwait",
        }
    }
}

impl ParkStrategy for Parker {
    #[inline(always)]
    fn park(&self, should_park: &dyn Fn() -> bool, deadline: Option<Instant>) -> bool {
        match self {
            Self::Futex(p) => p.park(should_park, deadline),
            Self::Condvar(p) => p.park(should_park, deadline),
            Self::SpinWait(p) => p.park(should_park, deadline),
        }
    }

    #[inline(always)]
    fn unpark(&self) {
        match self {
            Self::Futex(p) => p.unpark(),
            Self::Condvar(p) => p.unpark(),
            Self::SpinWait(p) => p.unpark(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Futex(p) => p.name(),
            Self::Condvar(p) => p.name(),
            Self::SpinWait(p) => p.name(),
        }
    }
}
