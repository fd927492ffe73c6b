use std::collections::{HashMap, HashSet, VecDeque};
use std::task::Waker;

/// Tasks waiting for a resource that is handed over one at a time, in
/// arrival order.
///
/// Releasing the resource does not make it free for grabs while someone is
/// queued: [`grant_next`](Self::grant_next) moves the head waiter to the
/// granted set, and that waiter owns the resource from then on, even before
/// it is polled again.
#[derive(Debug, Default)]
pub(crate) struct WaitQueue {
    /// Waiting tickets, oldest first.
    queue: VecDeque<(u64, Waker)>,

    /// Tickets that were handed the resource but have not claimed it yet.
    granted: HashSet<u64>,

    next_id: u64,
}

/// What [`WaitQueue::remove`] found for a departing waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Departure {
    /// Was still queued, nothing was handed to it.
    Queued,
    /// Had been granted the resource, which the caller must pass on.
    Granted,
    Unknown,
}

impl WaitQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues a new waiter at the back and returns its ticket.
    pub(crate) fn push(&mut self, waker: &Waker) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.queue.push_back((id, waker.clone()));
        id
    }

    /// Refreshes the waker of a queued waiter.
    pub(crate) fn update(&mut self, id: u64, waker: &Waker) {
        if let Some((_, stored)) = self.queue.iter_mut().find(|(queued, _)| *queued == id) {
            stored.clone_from(waker);
        }
    }

    /// Hands the resource to the head waiter and returns its waker.
    pub(crate) fn grant_next(&mut self) -> Option<Waker> {
        let (id, waker) = self.queue.pop_front()?;
        self.granted.insert(id);
        Some(waker)
    }

    /// Consumes a grant addressed to `id`.
    pub(crate) fn take_grant(&mut self, id: u64) -> bool {
        self.granted.remove(&id)
    }

    /// Forgets a waiter that gave up.
    pub(crate) fn remove(&mut self, id: u64) -> Departure {
        if self.granted.remove(&id) {
            return Departure::Granted;
        }

        match self.queue.iter().position(|(queued, _)| *queued == id) {
            Some(index) => {
                self.queue.remove(index);
                Departure::Queued
            }
            None => Departure::Unknown,
        }
    }

    /// Empties the queue (not the grants) and returns every waker.
    pub(crate) fn drain(&mut self) -> Vec<Waker> {
        self.queue.drain(..).map(|(_, waker)| waker).collect()
    }

    /// Number of waiters still queued.
    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Tasks waiting for an event that wakes all of them at once.
#[derive(Debug, Default)]
pub(crate) struct WakerSet {
    wakers: HashMap<u64, Waker>,
    next_id: u64,
}

impl WakerSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores `waker` under the caller's slot, allocating an id on first use.
    pub(crate) fn register(&mut self, slot: &mut Option<u64>, waker: &Waker) {
        let id = *slot.get_or_insert_with(|| {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);
            id
        });

        match self.wakers.get_mut(&id) {
            Some(stored) => stored.clone_from(waker),
            None => {
                self.wakers.insert(id, waker.clone());
            }
        }
    }

    pub(crate) fn remove(&mut self, id: u64) {
        self.wakers.remove(&id);
    }

    pub(crate) fn take_all(&mut self) -> Vec<Waker> {
        self.wakers.drain().map(|(_, waker)| waker).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.wakers.len()
    }
}

/// Wakes every waker in `wakers`. Call with no lock held.
pub(crate) fn wake_all(wakers: Vec<Waker>) {
    for waker in wakers {
        waker.wake();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_follow_arrival_order() {
        let mut queue = WaitQueue::new();
        let first = queue.push(Waker::noop());
        let second = queue.push(Waker::noop());

        assert!(queue.grant_next().is_some());
        assert!(!queue.take_grant(second));
        assert!(queue.take_grant(first));

        assert!(queue.grant_next().is_some());
        assert!(queue.take_grant(second));
        assert!(queue.grant_next().is_none());
    }

    #[test]
    fn departing_waiter_reports_what_it_held() {
        let mut queue = WaitQueue::new();
        let granted = queue.push(Waker::noop());
        let queued = queue.push(Waker::noop());

        queue.grant_next();

        assert_eq!(queue.remove(queued), Departure::Queued);
        assert_eq!(queue.remove(granted), Departure::Granted);
        assert_eq!(queue.remove(granted), Departure::Unknown);
        assert!(queue.is_empty());
    }

    #[test]
    fn waker_set_reuses_slot() {
        let mut set = WakerSet::new();
        let mut slot = None;

        set.register(&mut slot, Waker::noop());
        set.register(&mut slot, Waker::noop());
        assert_eq!(set.len(), 1);

        assert_eq!(set.take_all().len(), 1);
        assert_eq!(set.len(), 0);
    }
}
