//! Atomic primitives.
//!
//! Everything concurrent in the runtime bottoms out here:
//! - [`AtomicCell`], a fixed-width atomic word (`bool`, integers, pointers)
//!   where every access names its memory [`Ordering`],
//! - [`AtomicRefCount`], a counter whose decrement-to-zero is observed by
//!   exactly one thread, with the Release/Acquire-fence protocol,
//! - [`Backoff`], the capped exponential backoff used by every retry loop.

mod backoff;
mod cell;
mod refcount;

pub use backoff::Backoff;
pub use cell::{AtomicBits, AtomicCell, AtomicInteger, AtomicValue};
pub use refcount::AtomicRefCount;

#[doc(no_inline)]
pub use std::sync::atomic::Ordering;
