//! Time utilities driven by the reactor's timer queue.
//!
//! - [`sleep`] and [`sleep_until`] for waiting,
//! - [`timeout`] for bounding how long a future may take,
//! - [`interval`] for recurring ticks.

mod interval;
mod sleep;
mod timeout;

#[doc(inline)]
pub use interval::{Interval, interval};

#[doc(inline)]
pub use sleep::{Sleep, sleep, sleep_until};

#[doc(inline)]
pub use timeout::{Timeout, timeout};
