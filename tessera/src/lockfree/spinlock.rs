use crate::atomic::{AtomicCell, Backoff};

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::Ordering;

/// A test-and-test-and-set spinlock.
///
/// Acquisition swaps the lock word to `true` with `Acquire` ordering. While
/// the lock is held, contenders only read the word and back off locally
/// (spinning first, then yielding the thread) instead of hammering it with
/// writes. Release stores `false` with `Release` ordering.
///
/// Intended for very short critical sections such as the per-worker run
/// queues; anything that might wait on I/O belongs in an async
/// [`Mutex`](crate::sync::Mutex).
///
/// # Examples
///
/// ```rust
/// use tessera::lockfree::Spinlock;
///
/// let lock = Spinlock::new(Vec::new());
/// lock.lock().push(1);
///
/// let guard = lock.lock();
/// assert!(lock.try_lock().is_none());
/// drop(guard);
///
/// assert_eq!(lock.into_inner(), vec![1]);
/// ```
pub struct Spinlock<T> {
    locked: AtomicCell<bool>,
    data: UnsafeCell<T>,
}

// Safety: access to `data` is serialized by `locked`.
unsafe impl<T: Send> Send for Spinlock<T> {}
unsafe impl<T: Send> Sync for Spinlock<T> {}

impl<T> Spinlock<T> {
    pub fn new(value: T) -> Self {
        Self {
            locked: AtomicCell::new(false),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquires the lock, spinning until it is available.
    pub fn lock(&self) -> SpinlockGuard<'_, T> {
        let backoff = Backoff::new();

        loop {
            if !self.locked.swap(true, Ordering::Acquire) {
                return SpinlockGuard { lock: self };
            }

            while self.locked.load(Ordering::Relaxed) {
                backoff.snooze();
            }
        }
    }

    /// Acquires the lock only if it is currently free.
    pub fn try_lock(&self) -> Option<SpinlockGuard<'_, T>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SpinlockGuard { lock: self })
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for Spinlock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Spinlock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spinlock")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

/// Scoped access to the data behind a [`Spinlock`]. Unlocks on drop.
pub struct SpinlockGuard<'a, T> {
    lock: &'a Spinlock<T>,
}

impl<T> Deref for SpinlockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinlockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinlockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}
