use crate::lockfree::Spinlock;

use std::collections::VecDeque;

/// A bounded per-worker run queue.
///
/// The owning worker pops from the front (FIFO). Any thread may push at the
/// back, which is how `spawn` and wake-ups target a specific worker. Thieves
/// take the back half in one go.
///
/// The deque sits behind a [`Spinlock`]: critical sections are a handful of
/// pointer moves, and no code path ever holds two queue locks at once.
pub(crate) struct LocalQueue<T> {
    /// Held only for a push, a pop or one steal.
    inner: Spinlock<VecDeque<T>>,

    /// `push` refuses items beyond this.
    capacity: usize,
}

impl<T> LocalQueue<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inner: Spinlock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends `item`, or hands it back if the queue is full.
    pub(crate) fn push(&self, item: T) -> Result<(), T> {
        let mut queue = self.inner.lock();

        if queue.len() >= self.capacity {
            return Err(item);
        }

        queue.push_back(item);
        Ok(())
    }

    pub(crate) fn pop(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// Removes the back `len / 2` items, oldest first.
    ///
    /// A queue holding a single item yields nothing; its owner will get to
    /// it soon enough.
    pub(crate) fn steal_half(&self) -> Vec<T> {
        let mut queue = self.inner.lock();
        let count = queue.len() / 2;

        if count == 0 {
            return Vec::new();
        }

        let keep = queue.len() - count;
        queue.drain(keep..).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub(crate) fn drain(&self) -> Vec<T> {
        self.inner.lock().drain(..).collect()
    }
}

/// Scans the siblings of `thief` in round-robin order, starting just after
/// it, and steals half of the first queue that has anything to give.
///
/// Returns the victim's index and the stolen items.
pub(crate) fn steal<T>(queues: &[LocalQueue<T>], thief: usize) -> Option<(usize, Vec<T>)> {
    let len = queues.len();

    for offset in 1..len {
        let victim = (thief + offset) % len;
        let stolen = queues[victim].steal_half();

        if !stolen.is_empty() {
            return Some((victim, stolen));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, items: std::ops::Range<u32>) -> LocalQueue<u32> {
        let queue = LocalQueue::new(capacity);
        for item in items {
            queue.push(item).unwrap();
        }
        queue
    }

    #[test]
    fn owner_pops_in_fifo_order() {
        let queue = filled(8, 0..3);

        assert_eq!(queue.pop(), Some(0));
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn push_past_capacity_hands_item_back() {
        let queue = filled(2, 0..2);

        assert_eq!(queue.push(9), Err(9));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn one_steal_cycle_moves_half_of_eight() {
        let queues = vec![filled(256, 0..8), LocalQueue::new(256)];

        let (victim, stolen) = steal(&queues, 1).unwrap();

        assert_eq!(victim, 0);
        assert_eq!(stolen, vec![4, 5, 6, 7]);
        assert_eq!(queues[0].len(), 4);
        assert_eq!(queues[0].pop(), Some(0));
    }

    #[test]
    fn odd_counts_round_down() {
        let queue = filled(16, 0..7);

        assert_eq!(queue.steal_half().len(), 3);
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn single_item_victims_are_skipped() {
        let queues = vec![filled(4, 0..1), LocalQueue::new(4), filled(4, 10..14)];

        let (victim, stolen) = steal(&queues, 1).unwrap();

        assert_eq!(victim, 2);
        assert_eq!(stolen, vec![12, 13]);
        assert_eq!(queues[0].len(), 1);
    }

    #[test]
    fn nothing_to_steal_from_idle_siblings() {
        let queues: Vec<LocalQueue<u32>> = (0..3).map(|_| LocalQueue::new(4)).collect();
        assert!(steal(&queues, 0).is_none());

        let alone = vec![filled(4, 0..4)];
        assert!(steal(&alone, 0).is_none());
    }
}
