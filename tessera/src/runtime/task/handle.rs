use super::TaskId;
use super::core::Task;
use crate::error::JoinError;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// An owned permission to await a spawned task.
///
/// Resolves to `Ok(output)` when the task completes, or to a [`JoinError`]
/// if it panicked or was cancelled.
///
/// Dropping the `JoinHandle` does **not** cancel the task; it only discards
/// the ability to observe its result. Use [`abort`](Self::abort) for that.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use tessera::task;
/// use tessera::time::sleep;
///
/// #[tessera::main]
/// async fn main() {
///     let handle = task::spawn(sleep(Duration::from_secs(60)));
///     handle.abort();
///
///     assert!(handle.await.unwrap_err().is_cancelled());
/// }
/// ```
pub struct JoinHandle<T> {
    task: Arc<Task<T>>,
}

impl<T> JoinHandle<T> {
    pub(crate) fn new(task: Arc<Task<T>>) -> Self {
        Self { task }
    }

    /// Cancels the task.
    ///
    /// A task that is not currently being polled has its future dropped
    /// before this returns. A task in the middle of a poll is stopped once
    /// that poll returns; the handle resolves only after its future has been
    /// dropped. Awaiting the handle yields [`JoinError::Cancelled`], unless
    /// the task completed first, including on the poll the abort interrupted.
    pub fn abort(&self) {
        self.task.cancel();
    }

    /// Returns `true` once the task has completed or been cancelled and its
    /// future is gone.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn id(&self) -> TaskId {
        self.task.id()
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = Result<T, JoinError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.task.poll_join(cx)
    }
}

impl<T> fmt::Debug for JoinHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinHandle")
            .field("id", &self.id())
            .field("finished", &self.is_finished())
            .finish()
    }
}
