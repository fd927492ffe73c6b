use std::fmt;
use std::sync::atomic::{
    AtomicBool, AtomicI32, AtomicI64, AtomicPtr, AtomicU32, AtomicU64, AtomicUsize, Ordering,
};

mod sealed {
    pub trait Sealed {}
}

/// A value that fits in one machine word and can live inside an [`AtomicCell`].
///
/// Implemented for `bool`, `i32`, `i64`, `u32`, `u64`, `usize` and raw
/// `*mut U` pointers. The trait is sealed: the set of word types is fixed.
pub trait AtomicValue: Copy + sealed::Sealed {
    #[doc(hidden)]
    type Word: Send + Sync;

    #[doc(hidden)]
    fn into_word(self) -> Self::Word;
    #[doc(hidden)]
    fn from_word(word: Self::Word) -> Self;
    #[doc(hidden)]
    fn load(word: &Self::Word, order: Ordering) -> Self;
    #[doc(hidden)]
    fn store(word: &Self::Word, value: Self, order: Ordering);
    #[doc(hidden)]
    fn swap(word: &Self::Word, value: Self, order: Ordering) -> Self;
    #[doc(hidden)]
    fn compare_exchange(
        word: &Self::Word,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;
    #[doc(hidden)]
    fn compare_exchange_weak(
        word: &Self::Word,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;
}

/// Word types supporting bitwise read-modify-write (`bool` and the integers).
pub trait AtomicBits: AtomicValue {
    #[doc(hidden)]
    fn fetch_and(word: &Self::Word, value: Self, order: Ordering) -> Self;
    #[doc(hidden)]
    fn fetch_or(word: &Self::Word, value: Self, order: Ordering) -> Self;
    #[doc(hidden)]
    fn fetch_xor(word: &Self::Word, value: Self, order: Ordering) -> Self;
}

/// Integer word types supporting arithmetic read-modify-write.
///
/// Arithmetic wraps on overflow, matching the hardware instructions.
pub trait AtomicInteger: AtomicBits {
    #[doc(hidden)]
    fn fetch_add(word: &Self::Word, value: Self, order: Ordering) -> Self;
    #[doc(hidden)]
    fn fetch_sub(word: &Self::Word, value: Self, order: Ordering) -> Self;
    #[doc(hidden)]
    fn fetch_max(word: &Self::Word, value: Self, order: Ordering) -> Self;
    #[doc(hidden)]
    fn fetch_min(word: &Self::Word, value: Self, order: Ordering) -> Self;
}

macro_rules! atomic_word {
    ($ty:ty, $word:ty) => {
        impl sealed::Sealed for $ty {}

        impl AtomicValue for $ty {
            type Word = $word;

            fn into_word(self) -> $word {
                <$word>::new(self)
            }

            fn from_word(word: $word) -> Self {
                word.into_inner()
            }

            fn load(word: &$word, order: Ordering) -> Self {
                word.load(order)
            }

            fn store(word: &$word, value: Self, order: Ordering) {
                word.store(value, order)
            }

            fn swap(word: &$word, value: Self, order: Ordering) -> Self {
                word.swap(value, order)
            }

            fn compare_exchange(
                word: &$word,
                current: Self,
                new: Self,
                success: Ordering,
                failure: Ordering,
            ) -> Result<Self, Self> {
                word.compare_exchange(current, new, success, failure)
            }

            fn compare_exchange_weak(
                word: &$word,
                current: Self,
                new: Self,
                success: Ordering,
                failure: Ordering,
            ) -> Result<Self, Self> {
                word.compare_exchange_weak(current, new, success, failure)
            }
        }

        impl AtomicBits for $ty {
            fn fetch_and(word: &$word, value: Self, order: Ordering) -> Self {
                word.fetch_and(value, order)
            }

            fn fetch_or(word: &$word, value: Self, order: Ordering) -> Self {
                word.fetch_or(value, order)
            }

            fn fetch_xor(word: &$word, value: Self, order: Ordering) -> Self {
                word.fetch_xor(value, order)
            }
        }
    };
}

macro_rules! atomic_integer {
    ($($ty:ty => $word:ty),* $(,)?) => {
        $(
            atomic_word!($ty, $word);

            impl AtomicInteger for $ty {
                fn fetch_add(word: &$word, value: Self, order: Ordering) -> Self {
                    word.fetch_add(value, order)
                }

                fn fetch_sub(word: &$word, value: Self, order: Ordering) -> Self {
                    word.fetch_sub(value, order)
                }

                fn fetch_max(word: &$word, value: Self, order: Ordering) -> Self {
                    word.fetch_max(value, order)
                }

                fn fetch_min(word: &$word, value: Self, order: Ordering) -> Self {
                    word.fetch_min(value, order)
                }
            }
        )*
    };
}

atomic_word!(bool, AtomicBool);

atomic_integer! {
    i32 => AtomicI32,
    i64 => AtomicI64,
    u32 => AtomicU32,
    u64 => AtomicU64,
    usize => AtomicUsize,
}

impl<U> sealed::Sealed for *mut U {}

impl<U> AtomicValue for *mut U {
    type Word = AtomicPtr<U>;

    fn into_word(self) -> AtomicPtr<U> {
        AtomicPtr::new(self)
    }

    fn from_word(word: AtomicPtr<U>) -> Self {
        word.into_inner()
    }

    fn load(word: &AtomicPtr<U>, order: Ordering) -> Self {
        word.load(order)
    }

    fn store(word: &AtomicPtr<U>, value: Self, order: Ordering) {
        word.store(value, order)
    }

    fn swap(word: &AtomicPtr<U>, value: Self, order: Ordering) -> Self {
        word.swap(value, order)
    }

    fn compare_exchange(
        word: &AtomicPtr<U>,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self> {
        word.compare_exchange(current, new, success, failure)
    }

    fn compare_exchange_weak(
        word: &AtomicPtr<U>,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self> {
        word.compare_exchange_weak(current, new, success, failure)
    }
}

/// A single memory word accessed only through atomic operations.
///
/// Every operation takes an explicit [`Ordering`]. The [`get`](Self::get)
/// and [`set`](Self::set) shorthands use `SeqCst`, the strongest order, for
/// call sites that have not been shown to be safe with anything weaker.
///
/// `compare_exchange` follows the usual CAS contract: `Ok(previous)` when the
/// word held `current` and was replaced, `Err(observed)` otherwise. On failure
/// the caller re-reads and retries.
///
/// # Panics
///
/// Like the underlying hardware atomics, loads panic on `Release`/`AcqRel`,
/// stores panic on `Acquire`/`AcqRel`, and a CAS failure order may not be
/// `Release` or `AcqRel`.
///
/// # Examples
///
/// ```rust
/// use tessera::atomic::{AtomicCell, Ordering};
///
/// let cell = AtomicCell::new(5i64);
/// assert_eq!(cell.compare_exchange(5, 7, Ordering::AcqRel, Ordering::Acquire), Ok(5));
/// assert_eq!(cell.compare_exchange(5, 9, Ordering::AcqRel, Ordering::Acquire), Err(7));
/// assert_eq!(cell.fetch_add(1, Ordering::Relaxed), 7);
/// assert_eq!(cell.get(), 8);
/// ```
pub struct AtomicCell<T: AtomicValue> {
    word: T::Word,
}

impl<T: AtomicValue> AtomicCell<T> {
    /// Creates a new cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            word: value.into_word(),
        }
    }

    /// Loads the current value.
    #[inline]
    pub fn load(&self, order: Ordering) -> T {
        T::load(&self.word, order)
    }

    /// Stores `value`.
    #[inline]
    pub fn store(&self, value: T, order: Ordering) {
        T::store(&self.word, value, order)
    }

    /// Stores `value` and returns the previous value.
    #[inline]
    pub fn swap(&self, value: T, order: Ordering) -> T {
        T::swap(&self.word, value, order)
    }

    /// Replaces the value with `new` if it currently equals `current`.
    #[inline]
    pub fn compare_exchange(
        &self,
        current: T,
        new: T,
        success: Ordering,
        failure: Ordering,
    ) -> Result<T, T> {
        T::compare_exchange(&self.word, current, new, success, failure)
    }

    /// Like [`compare_exchange`](Self::compare_exchange) but may fail
    /// spuriously; only use it inside a retry loop.
    #[inline]
    pub fn compare_exchange_weak(
        &self,
        current: T,
        new: T,
        success: Ordering,
        failure: Ordering,
    ) -> Result<T, T> {
        T::compare_exchange_weak(&self.word, current, new, success, failure)
    }

    /// Applies `f` in a CAS-retry loop until it either returns `None` or
    /// the update lands. Returns `Ok(previous)` or `Err(previous)`.
    pub fn fetch_update<F>(&self, set: Ordering, fetch: Ordering, mut f: F) -> Result<T, T>
    where
        F: FnMut(T) -> Option<T>,
    {
        let mut previous = self.load(fetch);

        while let Some(next) = f(previous) {
            match self.compare_exchange_weak(previous, next, set, fetch) {
                Ok(value) => return Ok(value),
                Err(observed) => previous = observed,
            }
        }

        Err(previous)
    }

    /// Sequentially consistent load.
    #[inline]
    pub fn get(&self) -> T {
        self.load(Ordering::SeqCst)
    }

    /// Sequentially consistent store.
    #[inline]
    pub fn set(&self, value: T) {
        self.store(value, Ordering::SeqCst)
    }

    /// Consumes the cell and returns the contained value.
    pub fn into_inner(self) -> T {
        T::from_word(self.word)
    }
}

impl<T: AtomicBits> AtomicCell<T> {
    /// Bitwise AND, returning the previous value.
    #[inline]
    pub fn fetch_and(&self, value: T, order: Ordering) -> T {
        T::fetch_and(&self.word, value, order)
    }

    /// Bitwise OR, returning the previous value.
    #[inline]
    pub fn fetch_or(&self, value: T, order: Ordering) -> T {
        T::fetch_or(&self.word, value, order)
    }

    /// Bitwise XOR, returning the previous value.
    #[inline]
    pub fn fetch_xor(&self, value: T, order: Ordering) -> T {
        T::fetch_xor(&self.word, value, order)
    }
}

impl<T: AtomicInteger> AtomicCell<T> {
    /// Wrapping addition, returning the previous value.
    #[inline]
    pub fn fetch_add(&self, value: T, order: Ordering) -> T {
        T::fetch_add(&self.word, value, order)
    }

    /// Wrapping subtraction, returning the previous value.
    #[inline]
    pub fn fetch_sub(&self, value: T, order: Ordering) -> T {
        T::fetch_sub(&self.word, value, order)
    }

    /// Stores the maximum of the current value and `value`.
    #[inline]
    pub fn fetch_max(&self, value: T, order: Ordering) -> T {
        T::fetch_max(&self.word, value, order)
    }

    /// Stores the minimum of the current value and `value`.
    #[inline]
    pub fn fetch_min(&self, value: T, order: Ordering) -> T {
        T::fetch_min(&self.word, value, order)
    }
}

impl<T: AtomicValue + Default> Default for AtomicCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: AtomicValue> From<T> for AtomicCell<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: AtomicValue + fmt::Debug> fmt::Debug for AtomicCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicCell")
            .field(&self.load(Ordering::Relaxed))
            .finish()
    }
}
