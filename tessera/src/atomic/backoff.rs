use std::cell::Cell;
use std::hint;
use std::thread;

/// Upper bound on the exponent of busy-spin rounds.
const SPIN_LIMIT: u32 = 6;

/// After this many steps the caller should block instead of retrying.
const YIELD_LIMIT: u32 = 10;

/// Capped exponential backoff for CAS-retry loops.
///
/// [`spin`](Self::spin) only burns cycles and suits lock-free loops where
/// another thread is guaranteed to be making progress. [`snooze`](Self::snooze)
/// spins first and then falls back to yielding the OS thread, which is what
/// lock acquisition and idle workers use.
///
/// # Examples
///
/// ```rust
/// use std::sync::atomic::Ordering;
/// use tessera::atomic::{AtomicCell, Backoff};
///
/// let counter = AtomicCell::new(0u64);
/// let backoff = Backoff::new();
/// let mut current = counter.load(Ordering::Relaxed);
///
/// loop {
///     match counter.compare_exchange_weak(
///         current,
///         current + 1,
///         Ordering::AcqRel,
///         Ordering::Relaxed,
///     ) {
///         Ok(_) => break,
///         Err(actual) => {
///             current = actual;
///             backoff.spin();
///         }
///     }
/// }
///
/// assert_eq!(counter.load(Ordering::Relaxed), 1);
/// ```
pub struct Backoff {
    step: Cell<u32>,
}

impl Backoff {
    pub fn new() -> Self {
        Self { step: Cell::new(0) }
    }

    /// Restarts the backoff sequence.
    pub fn reset(&self) {
        self.step.set(0);
    }

    /// Busy-spins for `2^step` iterations (capped).
    pub fn spin(&self) {
        for _ in 0..1 << self.step.get().min(SPIN_LIMIT) {
            hint::spin_loop();
        }

        if self.step.get() <= SPIN_LIMIT {
            self.step.set(self.step.get() + 1);
        }
    }

    /// Spins while the wait is expected to be short, then yields the thread.
    pub fn snooze(&self) {
        if self.step.get() <= SPIN_LIMIT {
            for _ in 0..1 << self.step.get() {
                hint::spin_loop();
            }
        } else {
            thread::yield_now();
        }

        if self.step.get() <= YIELD_LIMIT {
            self.step.set(self.step.get() + 1);
        }
    }

    /// Returns `true` once spinning and yielding have been exhausted.
    pub fn is_completed(&self) -> bool {
        self.step.get() > YIELD_LIMIT
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
