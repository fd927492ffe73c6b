use super::AtomicCell;

use std::fmt;
use std::sync::atomic::{Ordering, fence};

/// Counts above this value are treated as a leak and abort the process.
const MAX_REFCOUNT: usize = isize::MAX as usize;

/// An atomic reference count whose decrement-to-zero is the unique
/// trigger for destruction.
///
/// Decrements use `Release` ordering and the single thread that observes
/// the transition to zero issues an `Acquire` fence before reporting it, so
/// every write made by any former owner happens-before the teardown.
///
/// # Examples
///
/// ```rust
/// use tessera::atomic::AtomicRefCount;
///
/// let count = AtomicRefCount::new(1);
/// count.increment();
/// assert!(!count.decrement());
/// assert!(count.decrement());
/// ```
pub struct AtomicRefCount {
    count: AtomicCell<usize>,
}

impl AtomicRefCount {
    /// Creates a counter starting at `initial` owners.
    pub fn new(initial: usize) -> Self {
        Self {
            count: AtomicCell::new(initial),
        }
    }

    /// Registers one more owner.
    ///
    /// A new owner can only be created from an existing one, so no ordering
    /// is required beyond atomicity.
    ///
    /// # Panics
    ///
    /// Aborts the process if the count exceeds `isize::MAX`, the same
    /// policy `Arc` applies to runaway clones.
    pub fn increment(&self) {
        let previous = self.count.fetch_add(1, Ordering::Relaxed);

        if previous > MAX_REFCOUNT {
            tracing::error!(count = previous, "reference count overflow");
            std::process::abort();
        }
    }

    /// Releases one owner. Returns `true` for exactly one caller: the one
    /// that brought the count to zero.
    ///
    /// # Panics
    ///
    /// Panics if the count is already zero: a second release of the last
    /// owner means the caller's ownership bookkeeping is corrupt.
    pub fn decrement(&self) -> bool {
        let mut current = self.count.load(Ordering::Relaxed);

        loop {
            assert!(current != 0, "reference count released below zero");

            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        if current != 1 {
            return false;
        }

        fence(Ordering::Acquire);
        true
    }

    /// Returns a snapshot of the current number of owners.
    ///
    /// The value may be stale as soon as it is returned.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

impl fmt::Debug for AtomicRefCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicRefCount")
            .field("count", &self.count())
            .finish()
    }
}
