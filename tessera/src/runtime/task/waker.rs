//! Task wakers.
//!
//! A task is its own waker: `Waker::from(Arc<Task<T>>)` goes through
//! [`std::task::Wake`], so cloning and dropping a waker are plain `Arc`
//! reference-count operations and no hand-written vtable is needed.
//!
//! Waking is safe from any thread, any number of times. Wakes that arrive
//! before the next poll coalesce into a single re-queue, and a wake on a
//! finished or cancelled task does nothing.

use super::core::Task;

use std::sync::Arc;
use std::task::Wake;

impl<T: Send + 'static> Wake for Task<T> {
    fn wake(self: Arc<Self>) {
        self.notify();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.notify();
    }
}
