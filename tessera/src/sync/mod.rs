//! Async-aware synchronization primitives.
//!
//! Tasks that cannot make progress are suspended and woken by the
//! operation that unblocks them; no primitive here blocks a thread.
//!
//! - [`Mutex`]: mutual exclusion with FIFO hand-off,
//! - [`Semaphore`]: counting permits with FIFO hand-off,
//! - [`channel`]: unbounded multi-producer multi-consumer queue,
//! - [`WaitGroup`]: wait for a counted set of tasks.
//!
//! Wait lists live behind short `parking_lot` locks, and wakers are always
//! invoked after those locks are released.

mod channel;
mod mutex;
mod semaphore;
mod wait_group;
mod waiters;

pub use channel::{Receiver, Recv, Sender, channel};
pub use mutex::{Lock, Mutex, MutexGuard};
pub use semaphore::{Acquire, Permit, Semaphore};
pub use wait_group::{Wait, WaitGroup};
