use super::waiters::{Departure, WaitQueue};
use crate::atomic::AtomicCell;
use crate::error::TryLockError;

use parking_lot::Mutex as WaiterLock;

use std::cell::UnsafeCell;
use std::fmt;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll};

/// An asynchronous mutex.
///
/// Tasks that cannot acquire the lock are suspended, not blocked, and are
/// granted the lock in the order they asked for it: releasing a contended
/// mutex hands it straight to the head waiter, so a newcomer can never
/// barge ahead of a task that is already queued.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use tessera::sync::Mutex;
/// use tessera::task;
///
/// #[tessera::main]
/// async fn main() {
///     let counter = Arc::new(Mutex::new(0));
///     let mut handles = Vec::new();
///
///     for _ in 0..8 {
///         let counter = counter.clone();
///         handles.push(task::spawn(async move {
///             *counter.lock().await += 1;
///         }));
///     }
///
///     for handle in handles {
///         handle.await.unwrap();
///     }
///
///     assert_eq!(*counter.lock().await, 8);
/// }
/// ```
pub struct Mutex<T: ?Sized> {
    /// Set while a guard exists or while the lock is being handed over.
    locked: AtomicCell<bool>,

    /// Tasks waiting for the lock, served in arrival order.
    waiters: WaiterLock<WaitQueue>,

    /// The protected value.
    data: UnsafeCell<T>,
}

// Safety: access to `data` is serialized by `locked`.
unsafe impl<T: ?Sized + Send> Send for Mutex<T> {}
unsafe impl<T: ?Sized + Send> Sync for Mutex<T> {}

impl<T> Mutex<T> {
    pub fn new(value: T) -> Self {
        Self {
            locked: AtomicCell::new(false),
            waiters: WaiterLock::new(WaitQueue::new()),
            data: UnsafeCell::new(value),
        }
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> Mutex<T> {
    /// Returns a future that resolves to a guard once the lock is acquired.
    ///
    /// Dropping the future before it resolves gives up its place in line; if
    /// the lock had already been handed to it, the lock moves on to the next
    /// waiter.
    pub fn lock(&self) -> Lock<'_, T> {
        Lock {
            mutex: self,
            ticket: None,
        }
    }

    /// Acquires the lock if it is free and nobody is queued for it.
    pub fn try_lock(&self) -> Result<MutexGuard<'_, T>, TryLockError> {
        if self.try_acquire() {
            Ok(MutexGuard { mutex: self })
        } else {
            Err(TryLockError)
        }
    }

    /// Borrows the data mutably; no locking is needed since the borrow
    /// checker proves exclusive access.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Passes the lock to the head waiter, or frees it if nobody waits.
    fn release(&self) {
        let mut waiters = self.waiters.lock();

        match waiters.grant_next() {
            Some(waker) => {
                // `locked` stays set: ownership moves to the waiter.
                drop(waiters);
                waker.wake();
            }
            None => {
                self.locked.store(false, Ordering::Release);
            }
        }
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Mutex");
        match self.try_lock() {
            Ok(guard) => d.field("data", &&*guard),
            Err(_) => d.field("data", &format_args!("<locked>")),
        };
        d.finish()
    }
}

/// Future returned by [`Mutex::lock`].
#[must_use = "futures do nothing unless polled"]
pub struct Lock<'a, T: ?Sized> {
    mutex: &'a Mutex<T>,

    /// Place in the wait queue, once queued.
    ticket: Option<u64>,
}

impl<'a, T: ?Sized> Future for Lock<'a, T> {
    type Output = MutexGuard<'a, T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mutex = this.mutex;

        match this.ticket {
            None => {
                if mutex.try_acquire() {
                    return Poll::Ready(MutexGuard { mutex });
                }

                let mut waiters = mutex.waiters.lock();

                // A release may have freed the lock before we got here; the
                // release path takes this same lock, so re-checking under it
                // cannot miss one.
                if mutex.try_acquire() {
                    return Poll::Ready(MutexGuard { mutex });
                }

                this.ticket = Some(waiters.push(cx.waker()));
                Poll::Pending
            }
            Some(ticket) => {
                let mut waiters = mutex.waiters.lock();

                if waiters.take_grant(ticket) {
                    this.ticket = None;
                    return Poll::Ready(MutexGuard { mutex });
                }

                waiters.update(ticket, cx.waker());
                Poll::Pending
            }
        }
    }
}

impl<T: ?Sized> Drop for Lock<'_, T> {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };

        let departure = self.mutex.waiters.lock().remove(ticket);

        if departure == Departure::Granted {
            self.mutex.release();
        }
    }
}

/// Guard returned by [`Mutex::lock`]. Releases the lock when dropped.
#[must_use = "if unused the Mutex will immediately unlock"]
pub struct MutexGuard<'a, T: ?Sized> {
    mutex: &'a Mutex<T>,
}

// Safety: a guard only hands out `&T` through `&self`.
unsafe impl<T: ?Sized + Sync> Sync for MutexGuard<'_, T> {}

impl<T: ?Sized> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: the guard is the unique lock holder.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T: ?Sized> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: the guard is the unique lock holder.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for MutexGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: ?Sized> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::task::Waker;

    fn poll<F: Future + Unpin>(future: &mut F) -> Poll<F::Output> {
        Pin::new(future).poll(&mut Context::from_waker(Waker::noop()))
    }

    #[test]
    fn waiters_are_granted_in_arrival_order() {
        let mutex = Mutex::new(Vec::new());
        let guard = mutex.try_lock().unwrap();

        let mut first = mutex.lock();
        let mut second = mutex.lock();
        assert!(poll(&mut first).is_pending());
        assert!(poll(&mut second).is_pending());

        drop(guard);

        // Handed to `first`, so a newcomer is turned away.
        assert!(mutex.try_lock().is_err());
        assert!(poll(&mut second).is_pending());

        let Poll::Ready(mut guard) = poll(&mut first) else {
            panic!("first waiter was not granted the lock");
        };
        guard.push(1);
        drop(guard);

        let Poll::Ready(mut guard) = poll(&mut second) else {
            panic!("second waiter was not granted the lock");
        };
        guard.push(2);
        drop(guard);
        drop((first, second));

        assert_eq!(mutex.into_inner(), vec![1, 2]);
    }

    #[test]
    fn abandoned_grant_moves_on() {
        let mutex = Mutex::new(());
        let guard = mutex.try_lock().unwrap();

        let mut first = mutex.lock();
        let mut second = mutex.lock();
        assert!(poll(&mut first).is_pending());
        assert!(poll(&mut second).is_pending());

        drop(guard);
        drop(first);

        assert!(poll(&mut second).is_ready());
    }

    #[test]
    fn dropped_waiter_leaves_lock_free() {
        let mutex = Mutex::new(());
        let guard = mutex.try_lock().unwrap();

        let mut waiter = mutex.lock();
        assert!(poll(&mut waiter).is_pending());
        drop(waiter);
        drop(guard);

        assert!(!mutex.is_locked());
        assert!(mutex.try_lock().is_ok());
    }
}
