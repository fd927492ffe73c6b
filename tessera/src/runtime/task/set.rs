use super::{JoinHandle, TaskId, spawn};
use crate::error::JoinError;

use std::future::{Future, poll_fn};
use std::pin::Pin;
use std::task::Poll;

/// A collection of spawned tasks awaited as a group.
///
/// Results come back in completion order. Dropping the set aborts whatever
/// is still running.
///
/// # Examples
///
/// ```rust
/// use tessera::task::JoinSet;
///
/// #[tessera::main]
/// async fn main() {
///     let mut set = JoinSet::new();
///     for i in 0..4 {
///         set.spawn(async move { i * 2 });
///     }
///
///     let mut results: Vec<_> = set.join_all().await.into_iter().map(Result::unwrap).collect();
///     results.sort();
///     assert_eq!(results, vec![0, 2, 4, 6]);
/// }
/// ```
pub struct JoinSet<T> {
    handles: Vec<JoinHandle<T>>,
}

impl<T: Send + 'static> JoinSet<T> {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// Spawns `future` on the current runtime and adds it to the set.
    pub fn spawn<F>(&mut self, future: F) -> TaskId
    where
        F: Future<Output = T> + Send + 'static,
    {
        let handle = spawn(future);
        let id = handle.id();
        self.handles.push(handle);
        id
    }

    /// Number of tasks not yet joined.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for any task in the set to finish and removes it.
    ///
    /// Returns `None` once the set is empty.
    pub async fn join_next(&mut self) -> Option<Result<T, JoinError>> {
        if self.handles.is_empty() {
            return None;
        }

        poll_fn(|cx| {
            for i in 0..self.handles.len() {
                if let Poll::Ready(result) = Pin::new(&mut self.handles[i]).poll(cx) {
                    // Order is not preserved, completion order is.
                    self.handles.swap_remove(i);
                    return Poll::Ready(Some(result));
                }
            }

            Poll::Pending
        })
        .await
    }

    /// Waits for every task, returning the results in completion order.
    pub async fn join_all(&mut self) -> Vec<Result<T, JoinError>> {
        let mut results = Vec::with_capacity(self.handles.len());

        while let Some(result) = self.join_next().await {
            results.push(result);
        }

        results
    }

    /// Aborts every task and empties the set.
    pub fn abort_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl<T: Send + 'static> Default for JoinSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for JoinSet<T> {
    fn drop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}
