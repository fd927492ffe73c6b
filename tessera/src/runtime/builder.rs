use super::Runtime;

use std::io;
use std::thread;

/// Builder for configuring and creating a runtime.
///
/// # Examples
///
/// ```rust
/// use tessera::RuntimeBuilder;
///
/// let runtime = RuntimeBuilder::new()
///     .worker_threads(2)
///     .local_queue_capacity(128)
///     .thread_name("app-worker")
///     .build()
///     .unwrap();
///
/// assert_eq!(runtime.block_on(async { 1 + 1 }), 2);
/// ```
#[derive(Clone, Debug)]
pub struct RuntimeBuilder {
    pub(crate) worker_threads: usize,
    pub(crate) local_queue_capacity: usize,
    pub(crate) thread_name: String,
    pub(crate) event_capacity: usize,
}

impl RuntimeBuilder {
    /// Creates a builder with the default configuration.
    ///
    /// By default, the number of worker threads is set to the number
    /// of available logical CPUs, falling back to `1` if unavailable.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            worker_threads,
            local_queue_capacity: 256,
            thread_name: "tessera-worker".to_owned(),
            event_capacity: 64,
        }
    }

    /// Sets the number of worker threads used by the runtime.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Sets how many tasks each worker's local queue holds before new work
    /// overflows to the global queue.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn local_queue_capacity(mut self, n: usize) -> Self {
        assert!(n > 0, "local_queue_capacity must be > 0");

        self.local_queue_capacity = n;
        self
    }

    /// Sets the worker thread name prefix; workers are named `{name}-{id}`.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Sets how many readiness events the reactor collects per turn.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn event_capacity(mut self, n: usize) -> Self {
        assert!(n > 0, "event_capacity must be > 0");

        self.event_capacity = n;
        self
    }

    /// Starts the reactor and the worker threads.
    ///
    /// # Errors
    ///
    /// Fails if the OS poller cannot be created or a thread cannot be
    /// spawned.
    pub fn build(self) -> io::Result<Runtime> {
        Runtime::from_builder(self)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
