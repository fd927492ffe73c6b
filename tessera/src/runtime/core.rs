use super::builder::RuntimeBuilder;
use super::context;
use super::executor::core::Executor;
use super::executor::worker::Worker;
use super::metrics::RuntimeMetrics;
use super::task::{Builder, JoinHandle, TaskInfo};
use crate::atomic::AtomicCell;
use crate::reactor::Reactor;

use tracing::debug;

use std::future::Future;
use std::io;
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, JoinHandle as ThreadHandle, Thread};

/// The runtime: a reactor thread, a pool of work-stealing workers and the
/// entry point [`block_on`](Self::block_on).
///
/// Dropping the runtime shuts everything down in order: workers stop and
/// are joined, every task that is still alive is cancelled (dropping its
/// future), and finally the reactor thread is stopped.
///
/// # Examples
///
/// ```rust
/// use tessera::Runtime;
///
/// let runtime = Runtime::new().unwrap();
///
/// let handle = runtime.spawn(async { 21 * 2 });
/// assert_eq!(runtime.block_on(handle).unwrap(), 42);
/// ```
pub struct Runtime {
    /// Queues, registry and counters shared with every worker and task.
    executor: Arc<Executor>,

    /// Worker threads, joined on drop.
    workers: Vec<ThreadHandle<()>>,

    /// Stopped last, after every task is gone.
    reactor: Reactor,
}

impl Runtime {
    /// Creates a runtime with the default [`RuntimeBuilder`] configuration.
    pub fn new() -> io::Result<Self> {
        RuntimeBuilder::new().build()
    }

    pub(crate) fn from_builder(builder: RuntimeBuilder) -> io::Result<Self> {
        let reactor = Reactor::start(builder.event_capacity)?;

        let executor = Arc::new(Executor::new(
            builder.worker_threads,
            builder.local_queue_capacity,
            reactor.handle().clone(),
        ));

        let mut runtime = Self {
            executor,
            workers: Vec::with_capacity(builder.worker_threads),
            reactor,
        };

        for id in 0..builder.worker_threads {
            let worker = Worker::new(id, runtime.executor.clone());

            // On failure `runtime` is dropped, which stops the workers
            // already started.
            let handle = thread::Builder::new()
                .name(format!("{}-{id}", builder.thread_name))
                .spawn(move || worker.run())?;

            runtime.workers.push(handle);
        }

        debug!(
            workers = builder.worker_threads,
            local_queue_capacity = builder.local_queue_capacity,
            "runtime started"
        );

        Ok(runtime)
    }

    /// Spawns a future onto the runtime.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.executor.spawn(Builder::new(), future)
    }

    /// Runs a future to completion on the current thread.
    ///
    /// The future is polled right here rather than on a worker, so it need
    /// not be `Send`. While it runs, this thread is inside the runtime
    /// context: it may spawn tasks, sleep and wait on I/O.
    ///
    /// # Panics
    ///
    /// Panics if called from a worker thread, where blocking would stall
    /// the scheduler.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        assert!(
            !context::is_worker_thread(),
            "cannot block_on from within a runtime worker thread"
        );

        let signal = Arc::new(ThreadSignal {
            notified: AtomicCell::new(false),
            thread: thread::current(),
        });
        let waker = Waker::from(signal.clone());
        let mut cx = Context::from_waker(&waker);

        let mut future = pin!(future);

        context::enter(&self.executor, None, || {
            loop {
                if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
                    return output;
                }

                while !signal.notified.swap(false, Ordering::Acquire) {
                    thread::park();
                }
            }
        })
    }

    /// Lists every live task, ordered by id.
    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.executor.tasks()
    }

    /// Snapshot of the runtime counters.
    pub fn metrics(&self) -> RuntimeMetrics {
        self.executor.metrics_snapshot()
    }

    pub fn worker_threads(&self) -> usize {
        self.executor.workers()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.executor.shutdown();

        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }

        let cancelled = self.executor.cancel_all();

        self.reactor.shutdown();

        debug!(cancelled, "runtime stopped");
    }
}

/// Wakes the thread blocked in [`Runtime::block_on`].
struct ThreadSignal {
    notified: AtomicCell<bool>,
    thread: Thread,
}

impl Wake for ThreadSignal {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.notified.store(true, Ordering::Release);
        self.thread.unpark();
    }
}
