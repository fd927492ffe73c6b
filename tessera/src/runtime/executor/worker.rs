use crate::atomic::Backoff;
use crate::runtime::context;
use crate::runtime::executor::core::Executor;
use crate::runtime::task::Runnable;
use crate::runtime::work_stealing::queue;

use tracing::{debug, trace};

use std::sync::Arc;

/// One scheduler thread.
///
/// The execution order is:
/// 1. Pop from the local queue
/// 2. Pop from the global queue
/// 3. Steal half of a sibling's local queue
/// 4. Back off, then park if no work is available
pub(crate) struct Worker {
    id: usize,
    executor: Arc<Executor>,
}

impl Worker {
    pub(crate) fn new(id: usize, executor: Arc<Executor>) -> Self {
        Self { id, executor }
    }

    /// Runs the worker loop until the executor shuts down.
    pub(crate) fn run(self) {
        context::enter(&self.executor, Some(self.id), || {
            debug!(worker = self.id, "worker started");
            self.run_loop();
            debug!(worker = self.id, "worker exited");
        });
    }

    fn run_loop(&self) {
        let backoff = Backoff::new();

        while self.executor.is_running() {
            match self.next_task() {
                Some(task) => {
                    backoff.reset();
                    self.executor.metrics().record_poll();
                    task.run();
                }
                None if backoff.is_completed() => {
                    self.executor.injector().park();
                    backoff.reset();
                }
                None => backoff.snooze(),
            }
        }
    }

    fn next_task(&self) -> Option<Arc<dyn Runnable>> {
        let locals = self.executor.locals();

        if let Some(task) = locals[self.id].pop() {
            return Some(task);
        }

        if let Some(task) = self.executor.injector().pop() {
            return Some(task);
        }

        self.steal()
    }

    /// Moves half of the first non-empty sibling queue into our own queue
    /// and returns the first stolen task.
    fn steal(&self) -> Option<Arc<dyn Runnable>> {
        let (victim, stolen) = queue::steal(self.executor.locals(), self.id)?;

        trace!(worker = self.id, victim, count = stolen.len(), "stole tasks");
        self.executor.metrics().record_steal(stolen.len());

        let mut stolen = stolen.into_iter();
        let first = stolen.next();

        for task in stolen {
            self.executor.push_local(self.id, task);
        }

        first
    }
}
