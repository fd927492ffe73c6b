use crate::atomic::AtomicCell;
use crate::reactor::ReactorHandle;
use crate::runtime::context;
use crate::runtime::metrics::{Metrics, RuntimeMetrics};
use crate::runtime::registry::TaskRegistry;
use crate::runtime::task::{Builder, Header, JoinHandle, Runnable, Task, TaskId, TaskInfo};
use crate::runtime::work_stealing::injector::Injector;
use crate::runtime::work_stealing::queue::LocalQueue;

use tracing::trace;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::Ordering;

/// Scheduler state shared by the runtime, every worker and every task.
///
/// The executor owns the global overflow queue, one bounded local queue per
/// worker, the registry of live tasks and the runtime counters. Worker
/// threads themselves are owned by [`Runtime`](crate::Runtime), which is the
/// only party allowed to start or stop them.
pub(crate) struct Executor {
    /// Global queue for overflow and for wakes from outside the workers.
    injector: Injector,

    /// One bounded queue per worker, indexed by worker id.
    locals: Box<[LocalQueue<Arc<dyn Runnable>>]>,

    /// Cleared once on shutdown. Workers read it with `Acquire`.
    running: AtomicCell<bool>,

    /// Every task spawned and not yet finished.
    registry: TaskRegistry,

    metrics: Metrics,

    /// Shared with every timer and readiness future spawned here.
    reactor: ReactorHandle,
}

impl Executor {
    pub(crate) fn new(workers: usize, local_capacity: usize, reactor: ReactorHandle) -> Self {
        let locals = (0..workers)
            .map(|_| LocalQueue::new(local_capacity))
            .collect();

        Self {
            injector: Injector::new(),
            locals,
            running: AtomicCell::new(true),
            registry: TaskRegistry::new(),
            metrics: Metrics::default(),
            reactor,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Wraps `future` into a task and queues it.
    ///
    /// The task goes to the local queue of worker `id % workers`; if that
    /// queue is full it overflows to the global queue. Siblings only steal
    /// from queues holding two or more tasks, so a lone task placed behind a
    /// long poll waits for its own worker. A task spawned after
    /// shutdown is cancelled straight away, so its handle resolves to
    /// [`JoinError::Cancelled`](crate::error::JoinError::Cancelled).
    pub(crate) fn spawn<F>(self: &Arc<Self>, builder: Builder, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let header = Header {
            id: TaskId::next(),
            name: builder.name,
            priority: builder.priority,
            deadline: builder.deadline,
            state: AtomicCell::new(0),
        };

        let task = Arc::new(Task::new(header, future, Arc::downgrade(self)));
        let handle = JoinHandle::new(task.clone());

        let runnable: Arc<dyn Runnable> = task;
        let id = runnable.header().id;

        self.metrics.record_spawn();

        if !self.is_running() {
            runnable.cancel();
            return handle;
        }

        self.registry.insert(&runnable);
        trace!(task.id = %id, task.name = runnable.header().name(), "task spawned");

        let target = (id.as_u64() % self.locals.len() as u64) as usize;
        self.push_local(target, runnable);
        self.injector.notify();

        handle
    }

    /// Re-queues a woken task.
    ///
    /// From a worker thread of this executor the task lands on that worker's
    /// own local queue; from anywhere else it goes to the global queue.
    pub(crate) fn schedule(&self, task: Arc<dyn Runnable>) {
        if !self.is_running() {
            task.cancel();
            return;
        }

        match context::current_worker(self) {
            Some(worker) => self.push_local(worker, task),
            None => {
                self.metrics.record_global_push();
                self.injector.push(task);
            }
        }
    }

    /// Pushes onto worker `index`'s queue, overflowing to the global queue.
    pub(crate) fn push_local(&self, index: usize, task: Arc<dyn Runnable>) {
        if let Err(task) = self.locals[index].push(task) {
            self.metrics.record_global_push();
            self.injector.push(task);
        }
    }

    /// Stops the workers: they observe the flag on their next loop turn and
    /// every parked worker is woken to do so.
    pub(crate) fn shutdown(&self) {
        self.running.store(false, Ordering::Release);
        self.injector.shutdown();
    }

    /// Cancels every task that is still queued or alive.
    ///
    /// Must run after the workers have exited: it empties the queues, then
    /// drops each live task's future, which releases every waker the task
    /// left in the reactor or in a sync primitive. Returns the number of
    /// tasks that were still pending.
    pub(crate) fn cancel_all(&self) -> usize {
        let mut queued: Vec<Arc<dyn Runnable>> = self.injector.drain();
        for local in self.locals.iter() {
            queued.extend(local.drain());
        }

        let live = self.registry.take_all();
        let count = live.len();

        for task in queued.iter().chain(live.iter()) {
            task.cancel();
        }

        count
    }

    pub(crate) fn injector(&self) -> &Injector {
        &self.injector
    }

    pub(crate) fn locals(&self) -> &[LocalQueue<Arc<dyn Runnable>>] {
        &self.locals
    }

    pub(crate) fn workers(&self) -> usize {
        self.locals.len()
    }

    pub(crate) fn reactor(&self) -> &ReactorHandle {
        &self.reactor
    }

    pub(crate) fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub(crate) fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub(crate) fn tasks(&self) -> Vec<TaskInfo> {
        self.registry.snapshot()
    }

    pub(crate) fn metrics_snapshot(&self) -> RuntimeMetrics {
        RuntimeMetrics {
            workers: self.workers(),
            live_tasks: self.registry.len(),
            global_queue_depth: self.injector.len(),
            pending_timers: self.reactor.pending_timers(),
            io_registrations: self.reactor.io_registrations(),
            ..self.metrics.snapshot()
        }
    }
}
