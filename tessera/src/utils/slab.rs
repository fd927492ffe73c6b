use std::mem::MaybeUninit;

/// A slab of reusable slots addressed by index.
///
/// Freed indices go on a stack and are handed out again by the next
/// [`insert`](Self::insert). The reactor keeps its timers here and pairs each
/// index with a generation number, so a stale key can never reach a slot that
/// has since been reused.
///
/// Removing an index that is out of range or not occupied means the caller's
/// bookkeeping is corrupt, and panics.
pub(crate) struct Slab<T> {
    /// Storage for items (may contain uninitialized slots).
    items: Vec<MaybeUninit<T>>,

    /// Stack of free indices that can be reused.
    free: Vec<usize>,

    /// Marks whether a slot is currently initialized.
    used: Vec<bool>,

    /// Number of occupied slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates a slab with `size` preallocated free slots.
    pub(crate) fn new(size: usize) -> Self {
        let items = (0..size).map(|_| MaybeUninit::<T>::uninit()).collect();
        let free = (0..size).rev().collect();
        let used = vec![false; size];

        Self {
            items,
            free,
            used,
            len: 0,
        }
    }

    /// Inserts a value and returns its index, doubling the storage when no
    /// free slot is left.
    pub(crate) fn insert(&mut self, item: T) -> usize {
        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                let len = self.items.len();
                let new_len = if len == 0 { 1 } else { 2 * len };

                self.items
                    .extend((len..new_len).map(|_| MaybeUninit::<T>::uninit()));
                self.free.extend(((len + 1)..new_len).rev());
                self.used.resize(new_len, false);

                len
            }
        };

        self.items[index] = MaybeUninit::new(item);
        self.used[index] = true;
        self.len += 1;

        index
    }

    /// Removes and returns the value stored at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range or the slot is empty.
    pub(crate) fn remove(&mut self, index: usize) -> T {
        assert!(index < self.items.len(), "slab index {index} out of range");
        assert!(self.used[index], "slab slot {index} is not occupied");

        self.free.push(index);
        self.used[index] = false;
        self.len -= 1;

        unsafe { self.items[index].assume_init_read() }
    }

    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        if self.contains(index) {
            Some(unsafe { self.items[index].assume_init_ref() })
        } else {
            None
        }
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if self.contains(index) {
            Some(unsafe { self.items[index].assume_init_mut() })
        } else {
            None
        }
    }

    pub(crate) fn contains(&self, index: usize) -> bool {
        self.used.get(index).copied().unwrap_or(false)
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Removes every value, returning them in index order.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len);

        for index in 0..self.items.len() {
            if self.used[index] {
                out.push(self.remove(index));
            }
        }

        out
    }
}

impl<T> Drop for Slab<T> {
    fn drop(&mut self) {
        for (slot, &used) in self.items.iter_mut().zip(self.used.iter()) {
            if used {
                unsafe { slot.assume_init_drop() };
            }
        }
    }
}
