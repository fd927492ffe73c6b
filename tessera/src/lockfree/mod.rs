//! Lock-free and spinning data structures built on [`crate::atomic`].
//!
//! - [`Spinlock`]: test-and-test-and-set lock with local backoff.
//! - [`RwLock`]: reader-writer lock in one word (writer bit + reader count).
//! - [`TreiberStack`]: lock-free LIFO.
//! - [`MsQueue`]: Michael-Scott lock-free FIFO.
//!
//! The stack and queue are non-blocking: no thread can hold up another, but
//! a thread may retry an unbounded number of times under contention. Nodes
//! are reclaimed through `crossbeam-epoch`.

mod queue;
mod rwlock;
mod spinlock;
mod stack;

pub use queue::MsQueue;
pub use rwlock::{RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use spinlock::{Spinlock, SpinlockGuard};
pub use stack::TreiberStack;
