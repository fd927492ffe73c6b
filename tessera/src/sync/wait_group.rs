use super::waiters::{self, WakerSet};
use crate::atomic::AtomicCell;

use parking_lot::Mutex;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll};

/// Waits for a set of tasks to finish.
///
/// The count is raised with [`add`](Self::add) and lowered with
/// [`done`](Self::done); [`wait`](Self::wait) resolves whenever it is zero.
/// Clones share the same count.
///
/// # Examples
///
/// ```rust
/// use tessera::sync::WaitGroup;
/// use tessera::task;
///
/// #[tessera::main]
/// async fn main() {
///     let group = WaitGroup::new();
///
///     for _ in 0..4 {
///         group.add(1);
///         let group = group.clone();
///         task::spawn(async move {
///             group.done();
///         });
///     }
///
///     group.wait().await;
///     assert_eq!(group.count(), 0);
/// }
/// ```
#[derive(Clone, Default)]
pub struct WaitGroup {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Outstanding `done` calls.
    count: AtomicCell<usize>,

    /// Woken all at once when `count` reaches zero.
    waiting: Mutex<WakerSet>,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: usize) {
        self.inner.count.fetch_add(n, Ordering::AcqRel);
    }

    /// Marks one unit of work as finished.
    ///
    /// # Panics
    ///
    /// Panics if the count is already zero.
    pub fn done(&self) {
        let Ok(previous) = self
            .inner
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        else {
            panic!("WaitGroup::done called more times than add");
        };

        if previous == 1 {
            let wakers = self.inner.waiting.lock().take_all();
            waiters::wake_all(wakers);
        }
    }

    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Resolves once the count reaches zero.
    pub fn wait(&self) -> Wait<'_> {
        Wait {
            group: self,
            slot: None,
        }
    }
}

impl fmt::Debug for WaitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitGroup")
            .field("count", &self.count())
            .finish()
    }
}

/// Future returned by [`WaitGroup::wait`].
#[must_use = "futures do nothing unless polled"]
pub struct Wait<'a> {
    group: &'a WaitGroup,
    slot: Option<u64>,
}

impl Future for Wait<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        let inner = &this.group.inner;

        if inner.count.load(Ordering::Acquire) == 0 {
            return Poll::Ready(());
        }

        let mut waiting = inner.waiting.lock();

        // `done` takes this lock after reaching zero; checking again under it
        // closes the gap.
        if inner.count.load(Ordering::Acquire) == 0 {
            if let Some(id) = this.slot.take() {
                waiting.remove(id);
            }
            return Poll::Ready(());
        }

        waiting.register(&mut this.slot, cx.waker());
        Poll::Pending
    }
}

impl Drop for Wait<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.slot.take() {
            self.group.inner.waiting.lock().remove(id);
        }
    }
}
