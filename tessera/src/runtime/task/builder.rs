use super::JoinHandle;
use super::meta::Priority;
use crate::runtime::context;

use std::future::Future;
use std::time::Instant;

/// Configures a task before spawning it.
///
/// Name, priority and deadline are metadata: they show up in
/// [`Runtime::tasks`](crate::Runtime::tasks) and in logs. A task that
/// finishes after its deadline is logged as a warning, nothing more.
///
/// # Examples
///
/// ```rust
/// use tessera::task::{self, Priority};
///
/// #[tessera::main]
/// async fn main() {
///     let handle = task::Builder::new()
///         .name("checksum")
///         .priority(Priority::High)
///         .spawn(async { 40 + 2 });
///
///     assert_eq!(handle.await.unwrap(), 42);
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct Builder {
    pub(crate) name: Option<String>,
    pub(crate) priority: Priority,
    pub(crate) deadline: Option<Instant>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Spawns `future` onto the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a runtime.
    pub fn spawn<F>(self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        context::current().spawn(self, future)
    }
}

/// Spawns a future as a task onto the current runtime.
///
/// The task starts on the local queue of worker `id % workers`, or on the
/// global queue if that one is full.
///
/// # Panics
///
/// Panics if called outside of a runtime.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    Builder::new().spawn(future)
}
