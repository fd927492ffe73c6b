use crate::utils::slab::Slab;

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::task::Waker;
use std::time::Instant;

/// Handle to an armed timer.
///
/// The generation makes keys single-use: once a timer fires or is cancelled,
/// its slot may be reused, but the old key will no longer match it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TimerKey {
    index: usize,
    generation: u64,
}

/// Slab entry for a pending timer. Its deadline lives in the heap item.
struct TimerEntry {
    /// Must match the key's generation for the key to be valid.
    generation: u64,

    /// Woken when the deadline passes.
    waker: Waker,
}

/// Pending timers ordered by deadline.
///
/// Entries live in a slab; a min-heap of `(deadline, index, generation)`
/// orders them. Cancelling only touches the slab, and the matching heap item
/// is discarded lazily once it reaches the top (or during compaction).
pub(crate) struct TimerQueue {
    /// Live timers, indexed by `TimerKey::index`.
    entries: Slab<TimerEntry>,

    /// `(deadline, index, generation)`; may hold stale items.
    heap: BinaryHeap<Reverse<(Instant, usize, u64)>>,

    next_generation: u64,
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self {
            entries: Slab::new(64),
            heap: BinaryHeap::new(),
            next_generation: 0,
        }
    }

    /// Arms a timer. The returned flag is `true` when it is now the earliest
    /// pending deadline, meaning the poller's current wait is too long.
    pub(crate) fn insert(&mut self, deadline: Instant, waker: &Waker) -> (TimerKey, bool) {
        let earliest = self.next_deadline().is_none_or(|next| deadline < next);

        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);

        let index = self.entries.insert(TimerEntry {
            generation,
            waker: waker.clone(),
        });

        self.heap.push(Reverse((deadline, index, generation)));
        self.compact();

        (TimerKey { index, generation }, earliest)
    }

    /// Replaces the waker of a pending timer. Returns `false` if the timer
    /// already fired or was cancelled.
    pub(crate) fn set_waker(&mut self, key: TimerKey, waker: &Waker) -> bool {
        match self.entries.get_mut(key.index) {
            Some(entry) if entry.generation == key.generation => {
                entry.waker.clone_from(waker);
                true
            }
            _ => false,
        }
    }

    /// Disarms a timer and hands back its waker, or `None` if it already
    /// fired or was cancelled.
    pub(crate) fn cancel(&mut self, key: TimerKey) -> Option<Waker> {
        if !self.is_live(key.index, key.generation) {
            return None;
        }

        Some(self.entries.remove(key.index).waker)
    }

    /// Earliest pending deadline, discarding stale heap items on the way.
    pub(crate) fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(&Reverse((deadline, index, generation))) = self.heap.peek() {
            if self.is_live(index, generation) {
                return Some(deadline);
            }
            self.heap.pop();
        }

        None
    }

    /// Removes every timer due at `now` and collects its waker.
    pub(crate) fn expire(&mut self, now: Instant, wakers: &mut Vec<Waker>) -> usize {
        let mut fired = 0;

        while let Some(&Reverse((deadline, index, generation))) = self.heap.peek() {
            if deadline > now {
                break;
            }

            self.heap.pop();

            if self.is_live(index, generation) {
                wakers.push(self.entries.remove(index).waker);
                fired += 1;
            }
        }

        fired
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Removes every pending timer without waking it, handing the wakers
    /// to the caller so they can be dropped outside the queue's lock.
    pub(crate) fn clear(&mut self) -> Vec<Waker> {
        self.heap.clear();
        self.entries
            .drain()
            .into_iter()
            .map(|entry| entry.waker)
            .collect()
    }

    fn is_live(&self, index: usize, generation: u64) -> bool {
        self.entries
            .get(index)
            .is_some_and(|entry| entry.generation == generation)
    }

    /// Rebuilds the heap once cancelled items outnumber live ones, so
    /// far-future timers that get cancelled do not pile up.
    fn compact(&mut self) {
        if self.heap.len() <= 2 * self.entries.len() + 64 {
            return;
        }

        let entries = &self.entries;
        self.heap.retain(|&Reverse((_, index, generation))| {
            entries
                .get(index)
                .is_some_and(|entry| entry.generation == generation)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn expires_in_deadline_order() {
        let mut timers = TimerQueue::new();
        let now = Instant::now();
        let waker = Waker::noop();

        let (_, first) = timers.insert(now + Duration::from_millis(30), waker);
        let (_, earlier) = timers.insert(now + Duration::from_millis(10), waker);
        let (_, later) = timers.insert(now + Duration::from_millis(20), waker);

        assert!(first);
        assert!(earlier);
        assert!(!later);
        assert_eq!(timers.next_deadline(), Some(now + Duration::from_millis(10)));

        let mut wakers = Vec::new();
        assert_eq!(timers.expire(now + Duration::from_millis(20), &mut wakers), 2);
        assert_eq!(wakers.len(), 2);
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut timers = TimerQueue::new();
        let now = Instant::now();
        let waker = Waker::noop();

        let (key, _) = timers.insert(now, waker);
        assert!(timers.cancel(key).is_some());
        assert!(timers.cancel(key).is_none());
        assert_eq!(timers.len(), 0);
        assert_eq!(timers.next_deadline(), None);

        let mut wakers = Vec::new();
        assert_eq!(timers.expire(now + Duration::from_secs(1), &mut wakers), 0);
    }

    #[test]
    fn stale_key_does_not_touch_reused_slot() {
        let mut timers = TimerQueue::new();
        let now = Instant::now();
        let waker = Waker::noop();

        let (old, _) = timers.insert(now, waker);
        let mut wakers = Vec::new();
        timers.expire(now, &mut wakers);

        let (new, _) = timers.insert(now + Duration::from_secs(1), waker);
        assert_eq!(old.index, new.index);

        assert!(timers.cancel(old).is_none());
        assert!(!timers.set_waker(old, waker));
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn reused_slot_takes_the_new_deadline() {
        let mut timers = TimerQueue::new();
        let now = Instant::now();
        let waker = Waker::noop();

        let (late, _) = timers.insert(now + Duration::from_millis(30), waker);
        timers.cancel(late);

        let (early, earliest) = timers.insert(now + Duration::from_millis(10), waker);
        assert_eq!(late.index, early.index);
        assert!(earliest);
        assert_eq!(timers.next_deadline(), Some(now + Duration::from_millis(10)));

        let mut wakers = Vec::new();
        assert_eq!(timers.expire(now + Duration::from_millis(15), &mut wakers), 1);
        assert_eq!(timers.next_deadline(), None);
    }

    #[test]
    fn heap_is_compacted_after_mass_cancellation() {
        let mut timers = TimerQueue::new();
        let far = Instant::now() + Duration::from_secs(3600);
        let waker = Waker::noop();

        for _ in 0..1000 {
            let (key, _) = timers.insert(far, waker);
            timers.cancel(key);
        }

        assert!(timers.heap.len() <= 2 + 64);
    }
}
