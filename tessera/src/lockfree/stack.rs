use crate::atomic::{AtomicCell, Backoff};

use crossbeam_epoch as epoch;

use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ptr;
use std::sync::atomic::Ordering;

struct Node<T> {
    /// Moved out by the thread whose CAS unlinks the node.
    value: ManuallyDrop<T>,

    /// Fixed before the node is published, never written afterwards.
    next: *mut Node<T>,
}

/// A Treiber stack: a lock-free LIFO built on one atomic head pointer.
///
/// `push` and `pop` are CAS-retry loops on `head`. A popped node is retired
/// to the epoch collector instead of being freed on the spot, because other
/// threads may still be reading its `next` field; the collector frees it once
/// every thread pinned at that time has moved on. The same rule keeps an
/// address from being reused while anyone still holds it, so the head CAS
/// cannot suffer from ABA.
///
/// # Examples
///
/// ```rust
/// use tessera::lockfree::TreiberStack;
///
/// let stack = TreiberStack::new();
/// stack.push(1);
/// stack.push(2);
/// assert_eq!(stack.pop(), Some(2));
/// assert_eq!(stack.pop(), Some(1));
/// assert_eq!(stack.pop(), None);
/// ```
pub struct TreiberStack<T> {
    head: AtomicCell<*mut Node<T>>,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send> Send for TreiberStack<T> {}
unsafe impl<T: Send> Sync for TreiberStack<T> {}

impl<T> TreiberStack<T> {
    pub fn new() -> Self {
        Self {
            head: AtomicCell::new(ptr::null_mut()),
            _marker: PhantomData,
        }
    }

    /// Pushes `value` on top of the stack.
    pub fn push(&self, value: T) {
        let node = Box::into_raw(Box::new(Node {
            value: ManuallyDrop::new(value),
            next: ptr::null_mut(),
        }));

        let backoff = Backoff::new();
        let mut head = self.head.load(Ordering::Relaxed);

        loop {
            // The node is still private, so plain writes are fine.
            unsafe { (*node).next = head };

            match self
                .head
                .compare_exchange_weak(head, node, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(observed) => {
                    head = observed;
                    backoff.spin();
                }
            }
        }
    }

    /// Pops the most recently pushed value, or `None` if the stack is empty.
    pub fn pop(&self) -> Option<T> {
        let guard = epoch::pin();
        let backoff = Backoff::new();

        loop {
            let head = self.head.load(Ordering::Acquire);
            if head.is_null() {
                return None;
            }

            // Safety: `head` was reachable while this thread is pinned, so it
            // has not been reclaimed even if another thread unlinked it.
            let next = unsafe { (*head).next };

            if self
                .head
                .compare_exchange(head, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                unsafe {
                    let value = ManuallyDrop::into_inner(ptr::read(&(*head).value));
                    guard.defer_unchecked(move || drop(Box::from_raw(head)));
                    return Some(value);
                }
            }

            backoff.spin();
        }
    }

    /// Returns `true` if the stack held no values at the time of the call.
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire).is_null()
    }
}

impl<T> Default for TreiberStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for TreiberStack<T> {
    fn drop(&mut self) {
        let mut current = self.head.load(Ordering::Relaxed);

        while !current.is_null() {
            let mut node = unsafe { Box::from_raw(current) };
            current = node.next;

            unsafe { ManuallyDrop::drop(&mut node.value) };
        }
    }
}

impl<T> fmt::Debug for TreiberStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreiberStack")
            .field("empty", &self.is_empty())
            .finish()
    }
}
