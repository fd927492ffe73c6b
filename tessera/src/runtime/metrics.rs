use crate::atomic::AtomicCell;

use std::sync::atomic::Ordering;

/// Live counters, bumped with `Relaxed` increments: they are statistics, not
/// synchronization.
#[derive(Default)]
pub(crate) struct Metrics {
    spawned: AtomicCell<u64>,
    completed: AtomicCell<u64>,
    cancelled: AtomicCell<u64>,
    panicked: AtomicCell<u64>,
    polls: AtomicCell<u64>,
    steals: AtomicCell<u64>,
    stolen: AtomicCell<u64>,
    global_pushes: AtomicCell<u64>,
}

impl Metrics {
    pub(crate) fn record_spawn(&self) {
        self.spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completion(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancellation(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_panic(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_steal(&self, count: usize) {
        self.steals.fetch_add(1, Ordering::Relaxed);
        self.stolen.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_global_push(&self) {
        self.global_pushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> RuntimeMetrics {
        RuntimeMetrics {
            workers: 0,
            spawned_tasks: self.spawned.load(Ordering::Relaxed),
            completed_tasks: self.completed.load(Ordering::Relaxed),
            cancelled_tasks: self.cancelled.load(Ordering::Relaxed),
            panicked_tasks: self.panicked.load(Ordering::Relaxed),
            polls: self.polls.load(Ordering::Relaxed),
            steal_operations: self.steals.load(Ordering::Relaxed),
            stolen_tasks: self.stolen.load(Ordering::Relaxed),
            global_queue_pushes: self.global_pushes.load(Ordering::Relaxed),
            live_tasks: 0,
            global_queue_depth: 0,
            pending_timers: 0,
            io_registrations: 0,
        }
    }
}

/// A point-in-time view of a runtime's counters, from
/// [`Runtime::metrics`](crate::Runtime::metrics).
///
/// Counters are cumulative since the runtime started. Gauges
/// (`live_tasks`, `global_queue_depth`, `pending_timers`,
/// `io_registrations`) describe the moment of the snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct RuntimeMetrics {
    pub workers: usize,
    pub spawned_tasks: u64,
    pub completed_tasks: u64,
    pub cancelled_tasks: u64,
    pub panicked_tasks: u64,
    pub polls: u64,
    pub steal_operations: u64,
    pub stolen_tasks: u64,
    pub global_queue_pushes: u64,
    pub live_tasks: usize,
    pub global_queue_depth: usize,
    pub pending_timers: usize,
    pub io_registrations: usize,
}
