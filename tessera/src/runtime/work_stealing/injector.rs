use crate::atomic::AtomicCell;
use crate::runtime::task::Runnable;

use parking_lot::{Condvar, Mutex};

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Upper bound on how long an idle worker sleeps before re-scanning.
///
/// Pushes into local queues do not go through the condvar lock, so a
/// notification can slip past a worker that is about to park; the timed
/// wait bounds that delay.
const PARK_TIMEOUT: Duration = Duration::from_millis(1);

/// The global overflow queue, shared by every worker.
///
/// Receives tasks spawned or woken from outside the worker threads and tasks
/// that did not fit in a full local queue. Its mutex doubles as the lock
/// idle workers park on.
pub(crate) struct Injector {
    queue: Mutex<VecDeque<Arc<dyn Runnable>>>,

    /// Idle workers park here.
    condvar: Condvar,

    /// Once set, `park` returns immediately.
    shutdown: AtomicCell<bool>,
}

impl Injector {
    pub(crate) fn new() -> Self {
        Injector {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            shutdown: AtomicCell::new(false),
        }
    }

    pub(crate) fn push(&self, task: Arc<dyn Runnable>) {
        self.queue.lock().push_back(task);
        self.condvar.notify_one();
    }

    pub(crate) fn pop(&self) -> Option<Arc<dyn Runnable>> {
        self.queue.lock().pop_front()
    }

    /// Wakes one parked worker, e.g. after pushing into a local queue.
    pub(crate) fn notify(&self) {
        self.condvar.notify_one();
    }

    /// Parks the calling worker until a push, a notification, shutdown or
    /// [`PARK_TIMEOUT`].
    pub(crate) fn park(&self) {
        let mut queue = self.queue.lock();

        if !queue.is_empty() || self.shutdown.load(Ordering::Acquire) {
            return;
        }

        self.condvar.wait_for(&mut queue, PARK_TIMEOUT);
    }

    /// Wakes every parked worker and keeps them from parking again.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);

        // Taking the lock orders the flag before any worker's re-check.
        let _queue = self.queue.lock();
        self.condvar.notify_all();
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub(crate) fn drain(&self) -> Vec<Arc<dyn Runnable>> {
        self.queue.lock().drain(..).collect()
    }
}
