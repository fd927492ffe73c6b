use crate::atomic::{AtomicCell, Backoff};

use crossbeam_epoch as epoch;

use std::fmt;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::Ordering;

struct Node<T> {
    /// Initialized for every node except the current dummy head.
    value: MaybeUninit<T>,
    next: AtomicCell<*mut Node<T>>,
}

impl<T> Node<T> {
    fn boxed(value: MaybeUninit<T>) -> *mut Node<T> {
        Box::into_raw(Box::new(Node {
            value,
            next: AtomicCell::new(ptr::null_mut()),
        }))
    }
}

/// A Michael-Scott queue: a lock-free FIFO with separate head and tail
/// pointers over a singly linked list that always starts with a dummy node.
///
/// `enqueue` links the new node onto `tail.next` and then swings `tail`;
/// `dequeue` advances `head`, turning the first real node into the new
/// dummy. `tail` may lag one node behind the true end of the list. Whoever
/// notices the lag advances it before going on, so it heals itself.
/// `head.next == null` always means empty.
///
/// Unlinked dummies are retired to the epoch collector, like
/// [`TreiberStack`](super::TreiberStack).
///
/// # Examples
///
/// ```rust
/// use tessera::lockfree::MsQueue;
///
/// let queue = MsQueue::new();
/// queue.enqueue("a");
/// queue.enqueue("b");
/// assert!(!queue.is_empty());
/// assert_eq!(queue.dequeue(), Some("a"));
/// assert_eq!(queue.dequeue(), Some("b"));
/// assert!(queue.is_empty());
/// ```
pub struct MsQueue<T> {
    head: AtomicCell<*mut Node<T>>,
    tail: AtomicCell<*mut Node<T>>,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send> Send for MsQueue<T> {}
unsafe impl<T: Send> Sync for MsQueue<T> {}

impl<T> MsQueue<T> {
    pub fn new() -> Self {
        let dummy = Node::boxed(MaybeUninit::uninit());

        Self {
            head: AtomicCell::new(dummy),
            tail: AtomicCell::new(dummy),
            _marker: PhantomData,
        }
    }

    /// Appends `value` at the back of the queue.
    pub fn enqueue(&self, value: T) {
        let node = Node::boxed(MaybeUninit::new(value));
        let _guard = epoch::pin();
        let backoff = Backoff::new();

        loop {
            let tail = self.tail.load(Ordering::Acquire);

            // Safety: nodes reachable from `tail` are not reclaimed while pinned.
            let next = unsafe { (*tail).next.load(Ordering::Acquire) };

            if tail != self.tail.load(Ordering::Acquire) {
                continue;
            }

            if next.is_null() {
                let linked = unsafe {
                    (*tail).next.compare_exchange(
                        ptr::null_mut(),
                        node,
                        Ordering::Release,
                        Ordering::Relaxed,
                    )
                };

                if linked.is_ok() {
                    // Failing here is fine: someone else already swung it.
                    let _ = self.tail.compare_exchange(
                        tail,
                        node,
                        Ordering::Release,
                        Ordering::Relaxed,
                    );
                    return;
                }
            } else {
                let _ =
                    self.tail
                        .compare_exchange(tail, next, Ordering::Release, Ordering::Relaxed);
            }

            backoff.spin();
        }
    }

    /// Removes the value at the front of the queue, or returns `None` if the
    /// queue is empty.
    pub fn dequeue(&self) -> Option<T> {
        let guard = epoch::pin();
        let backoff = Backoff::new();

        loop {
            let head = self.head.load(Ordering::Acquire);
            let tail = self.tail.load(Ordering::Acquire);
            let next = unsafe { (*head).next.load(Ordering::Acquire) };

            if head != self.head.load(Ordering::Acquire) {
                continue;
            }

            if next.is_null() {
                return None;
            }

            if head == tail {
                // Tail lags behind a node that is already linked: help it
                // along before head can overtake it.
                let _ =
                    self.tail
                        .compare_exchange(tail, next, Ordering::Release, Ordering::Relaxed);
                continue;
            }

            if self
                .head
                .compare_exchange(head, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                unsafe {
                    // `next` is the new dummy; its value now belongs to us.
                    let value = ptr::read((*next).value.as_ptr());
                    guard.defer_unchecked(move || drop(Box::from_raw(head)));
                    return Some(value);
                }
            }

            backoff.spin();
        }
    }

    /// Returns `true` if the queue held no values at the time of the call.
    pub fn is_empty(&self) -> bool {
        let _guard = epoch::pin();
        let head = self.head.load(Ordering::Acquire);

        unsafe { (*head).next.load(Ordering::Acquire).is_null() }
    }
}

impl<T> Default for MsQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for MsQueue<T> {
    fn drop(&mut self) {
        while self.dequeue().is_some() {}

        let dummy = self.head.load(Ordering::Relaxed);
        drop(unsafe { Box::from_raw(dummy) });
    }
}

impl<T> fmt::Debug for MsQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MsQueue")
            .field("empty", &self.is_empty())
            .finish()
    }
}
