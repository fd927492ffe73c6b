use crate::atomic::{AtomicCell, Backoff};

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::Ordering;

/// High bit of the state word: a writer holds the lock.
const WRITER: usize = 1 << (usize::BITS - 1);

/// Low bits of the state word: number of live readers.
const READERS: usize = WRITER - 1;

/// A spinning reader-writer lock packed into a single word.
///
/// Readers join with a CAS that increments the reader count, and only while
/// the writer bit is clear. A writer acquires only when the word is exactly
/// zero (no readers, no writer). Waiters back off locally.
///
/// Writers are not prioritized: a steady stream of readers can keep a writer
/// waiting.
///
/// # Examples
///
/// ```rust
/// use tessera::lockfree::RwLock;
///
/// let lock = RwLock::new(5);
///
/// {
///     let a = lock.read();
///     let b = lock.read();
///     assert_eq!(*a + *b, 10);
///     assert!(lock.try_write().is_none());
/// }
///
/// *lock.write() += 1;
/// assert_eq!(*lock.read(), 6);
/// ```
pub struct RwLock<T> {
    state: AtomicCell<usize>,
    data: UnsafeCell<T>,
}

// Safety: shared access requires `T: Sync`, exclusive access is serialized
// by the writer bit.
unsafe impl<T: Send> Send for RwLock<T> {}
unsafe impl<T: Send + Sync> Sync for RwLock<T> {}

impl<T> RwLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: AtomicCell::new(0),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquires shared access.
    ///
    /// # Panics
    ///
    /// Panics if the reader count would overflow into the writer bit.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        let backoff = Backoff::new();

        loop {
            if let Some(guard) = self.try_read() {
                return guard;
            }

            backoff.snooze();
        }
    }

    /// Acquires shared access if no writer holds the lock.
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
        let backoff = Backoff::new();
        let mut state = self.state.load(Ordering::Relaxed);

        loop {
            if state & WRITER != 0 {
                return None;
            }

            assert!(state & READERS != READERS, "RwLock reader count overflow");

            match self.state.compare_exchange_weak(
                state,
                state + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(RwLockReadGuard { lock: self }),
                Err(observed) => {
                    state = observed;
                    backoff.spin();
                }
            }
        }
    }

    /// Acquires exclusive access.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        let backoff = Backoff::new();

        loop {
            if let Some(guard) = self.try_write() {
                return guard;
            }

            backoff.snooze();
        }
    }

    /// Acquires exclusive access if the lock is completely free.
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
        self.state
            .compare_exchange(0, WRITER, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| RwLockWriteGuard { lock: self })
    }

    /// Returns the number of readers currently holding the lock.
    pub fn reader_count(&self) -> usize {
        self.state.load(Ordering::Relaxed) & READERS
    }

    /// Returns `true` if a writer currently holds the lock.
    pub fn is_write_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) & WRITER != 0
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for RwLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for RwLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RwLock")
            .field("readers", &self.reader_count())
            .field("writer", &self.is_write_locked())
            .finish_non_exhaustive()
    }
}

/// Shared access to the data behind an [`RwLock`].
pub struct RwLockReadGuard<'a, T> {
    lock: &'a RwLock<T>,
}

impl<T> Deref for RwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for RwLockReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.state.fetch_sub(1, Ordering::Release);
    }
}

/// Exclusive access to the data behind an [`RwLock`].
pub struct RwLockWriteGuard<'a, T> {
    lock: &'a RwLock<T>,
}

impl<T> Deref for RwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for RwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for RwLockWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.state.store(0, Ordering::Release);
    }
}
