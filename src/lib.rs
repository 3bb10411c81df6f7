/*!
 * Butex
 *
 * A futex-like 32-bit synchronization word for M:N task runtimes: waiting
 * contexts are descheduled through a pluggable parker instead of being
 * blocked in the kernel on the word itself.
 *
 * # Architecture
 *
 * - **Lifecycle**: heap-owned `Butex` (shared, freed by the last release)
 *   or placement `ButexRef` over caller-owned `ButexMemory`
 * - **Wait queue**: per-butex FIFO of waiter records under a short lock
 * - **Wake engine**: `wake`, `wake_all`, `wake_except`, `requeue`
 * - **Wait engine**: `wait` / `wait_uninterruptible`, absolute deadlines,
 *   cooperative cancellation through `Context::stop`
 * - **Lifetime bridge**: `pin_before_wake` so a wake can race `destroy`
 *
 * # Example
 *
 * ```
 * use butex::{Butex, Deadline};
 * use std::thread;
 * use std::time::Duration;
 *
 * let butex = Butex::create();
 * let waiter = {
 *     let butex = butex.clone();
 *     thread::spawn(move || butex.wait(0, Some(Deadline::after(Duration::from_secs(5)))))
 * };
 *
 * // Publish the change, then wake. A waiter that has not queued yet sees 1 and never parks.
 * butex.store(1);
 * butex.wake_all();
 * let result = waiter.join().unwrap();
 * assert!(result.is_ok() || result.unwrap_err().is_value_mismatch());
 * ```
 */

mod bridge;
mod butex;
mod context;
mod deadline;
mod placement;
mod queue;
mod wait;
mod wake;

pub mod config;
pub mod errors;
pub mod park;
pub mod stats;

pub use bridge::PinnedButex;
pub use butex::{Butex, ButexCore, ButexWord, TypedButex};
pub use config::{StrategyType, SyncConfig};
pub use context::{Context, ContextId};
pub use deadline::Deadline;
pub use errors::{ConfigError, WaitError, WaitResult};
pub use placement::{ButexMemory, ButexRef, BUTEX_MEMORY_SIZE};
pub use stats::StatsSnapshot;
