use super::waiters::{self, Departure, WaitQueue};
use crate::atomic::AtomicCell;
use crate::error::{AcquireError, TryAcquireError};

use parking_lot::Mutex;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll, Waker};

/// A counting semaphore with FIFO hand-off.
///
/// `acquire` takes a permit if one is available and otherwise queues the
/// task. A released permit goes to the head waiter directly, so no more
/// permits are ever held at once than the semaphore was given.
///
/// # Examples
///
/// ```rust
/// use tessera::sync::Semaphore;
///
/// #[tessera::main]
/// async fn main() {
///     let semaphore = Semaphore::new(2);
///
///     let a = semaphore.acquire().await.unwrap();
///     let _b = semaphore.acquire().await.unwrap();
///     assert!(semaphore.try_acquire().is_err());
///
///     drop(a);
///     assert_eq!(semaphore.available_permits(), 1);
/// }
/// ```
pub struct Semaphore {
    /// Permits nobody holds and no waiter has been granted.
    permits: AtomicCell<usize>,

    /// Written under `waiters`, read lock-free on the fast paths.
    closed: AtomicCell<bool>,

    /// Tasks waiting in arrival order. Releases are serialized by it.
    waiters: Mutex<WaitQueue>,
}

impl Semaphore {
    /// Creates a semaphore holding `permits` permits.
    pub fn new(permits: usize) -> Self {
        Self {
            permits: AtomicCell::new(permits),
            closed: AtomicCell::new(false),
            waiters: Mutex::new(WaitQueue::new()),
        }
    }

    /// Waits for a permit.
    ///
    /// Fails with [`AcquireError::Closed`] once the semaphore is closed.
    /// Dropping the future gives up its place in line, passing on a permit
    /// it had already been handed.
    pub fn acquire(&self) -> Acquire<'_> {
        Acquire {
            semaphore: self,
            ticket: None,
        }
    }

    /// Takes a permit without waiting.
    ///
    /// Fails with [`TryAcquireError::NoPermits`] when every permit is held,
    /// even if waiters are queued, and with [`TryAcquireError::Closed`]
    /// after [`close`](Self::close).
    pub fn try_acquire(&self) -> Result<Permit<'_>, TryAcquireError> {
        if self.is_closed() {
            return Err(TryAcquireError::Closed);
        }

        if self.take_permit() {
            Ok(Permit { semaphore: self })
        } else {
            Err(TryAcquireError::NoPermits)
        }
    }

    /// Permits that can be taken right now.
    pub fn available_permits(&self) -> usize {
        self.permits.load(Ordering::Acquire)
    }

    /// Adds `n` permits, serving queued waiters first.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::sync::Semaphore;
    ///
    /// let semaphore = Semaphore::new(1);
    /// semaphore.try_acquire().unwrap().forget();
    /// assert_eq!(semaphore.available_permits(), 0);
    ///
    /// semaphore.add_permits(2);
    /// assert_eq!(semaphore.available_permits(), 2);
    /// ```
    pub fn add_permits(&self, n: usize) {
        let mut wakers = Vec::new();

        {
            let mut queue = self.waiters.lock();
            let mut remaining = n;

            while remaining > 0
                && let Some(waker) = queue.grant_next()
            {
                wakers.push(waker);
                remaining -= 1;
            }

            if remaining > 0 {
                self.permits.fetch_add(remaining, Ordering::Release);
            }
        }

        waiters::wake_all(wakers);
    }

    /// Closes the semaphore: pending and future `acquire` calls fail.
    ///
    /// Permits already held stay valid. Waiters that had been handed a
    /// permit before the close still receive it.
    pub fn close(&self) {
        let wakers = {
            let mut queue = self.waiters.lock();
            self.closed.store(true, Ordering::Release);
            queue.drain()
        };

        waiters::wake_all(wakers);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn take_permit(&self) -> bool {
        self.permits
            .fetch_update(Ordering::Acquire, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }

    fn release(&self) {
        self.add_permits(1);
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("permits", &self.available_permits())
            .field("closed", &self.is_closed())
            .field("waiters", &self.waiters.lock().len())
            .finish()
    }
}

/// Future returned by [`Semaphore::acquire`].
#[must_use = "futures do nothing unless polled"]
pub struct Acquire<'a> {
    semaphore: &'a Semaphore,

    /// Place in the wait queue, once queued.
    ticket: Option<u64>,
}

impl<'a> Acquire<'a> {
    fn queue(&mut self, waker: &Waker) -> Poll<Result<Permit<'a>, AcquireError>> {
        let semaphore = self.semaphore;
        let mut queue = semaphore.waiters.lock();

        if semaphore.is_closed() {
            return Poll::Ready(Err(AcquireError::Closed));
        }

        // Permits only grow under this lock, so a re-check here cannot
        // race with a release.
        if semaphore.take_permit() {
            return Poll::Ready(Ok(Permit { semaphore }));
        }

        self.ticket = Some(queue.push(waker));
        Poll::Pending
    }
}

impl<'a> Future for Acquire<'a> {
    type Output = Result<Permit<'a>, AcquireError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let semaphore = this.semaphore;

        let Some(ticket) = this.ticket else {
            if semaphore.is_closed() {
                return Poll::Ready(Err(AcquireError::Closed));
            }

            if semaphore.take_permit() {
                return Poll::Ready(Ok(Permit { semaphore }));
            }

            return this.queue(cx.waker());
        };

        let mut queue = semaphore.waiters.lock();

        if queue.take_grant(ticket) {
            this.ticket = None;
            return Poll::Ready(Ok(Permit { semaphore }));
        }

        if semaphore.is_closed() {
            queue.remove(ticket);
            this.ticket = None;
            return Poll::Ready(Err(AcquireError::Closed));
        }

        queue.update(ticket, cx.waker());
        Poll::Pending
    }
}

impl Drop for Acquire<'_> {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };

        let departure = self.semaphore.waiters.lock().remove(ticket);

        if departure == Departure::Granted {
            self.semaphore.release();
        }
    }
}

/// One acquired permit. Returned to the semaphore when dropped.
#[must_use = "the permit is released as soon as it is dropped"]
pub struct Permit<'a> {
    semaphore: &'a Semaphore,
}

impl Permit<'_> {
    /// Keeps the permit out of circulation for good.
    pub fn forget(self) {
        std::mem::forget(self);
    }
}

impl fmt::Debug for Permit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit").finish_non_exhaustive()
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll<F: Future + Unpin>(future: &mut F) -> Poll<F::Output> {
        Pin::new(future).poll(&mut Context::from_waker(Waker::noop()))
    }

    #[test]
    fn released_permit_goes_to_head_waiter() {
        let semaphore = Semaphore::new(1);
        let held = semaphore.try_acquire().unwrap();

        let mut first = semaphore.acquire();
        let mut second = semaphore.acquire();
        assert!(poll(&mut first).is_pending());
        assert!(poll(&mut second).is_pending());

        drop(held);

        assert_eq!(semaphore.available_permits(), 0);
        assert!(poll(&mut second).is_pending());
        assert!(matches!(poll(&mut first), Poll::Ready(Ok(_))));
    }

    #[test]
    fn close_fails_queued_waiters() {
        let semaphore = Semaphore::new(0);

        let mut waiter = semaphore.acquire();
        assert!(poll(&mut waiter).is_pending());

        semaphore.close();

        assert!(matches!(poll(&mut waiter), Poll::Ready(Err(AcquireError::Closed))));
        assert_eq!(semaphore.try_acquire().unwrap_err(), TryAcquireError::Closed);
    }

    #[test]
    fn forgotten_permit_is_not_returned() {
        let semaphore = Semaphore::new(1);
        semaphore.try_acquire().unwrap().forget();
        assert_eq!(semaphore.available_permits(), 0);
    }
}
