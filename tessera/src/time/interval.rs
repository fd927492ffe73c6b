use crate::time::sleep::{Sleep, sleep_until};

use std::time::{Duration, Instant};

/// Creates an [`Interval`] that ticks every `period`, the first tick one
/// period from now.
///
/// # Panics
///
/// Panics if `period` is zero.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// #[tessera::main]
/// async fn main() {
///     let mut interval = tessera::time::interval(Duration::from_millis(5));
///     let first = interval.tick().await;
///     let second = interval.tick().await;
///     assert!(second - first >= Duration::from_millis(5));
/// }
/// ```
pub fn interval(period: Duration) -> Interval {
    assert!(!period.is_zero(), "interval period must be non-zero");

    Interval {
        period,
        sleep: sleep_until(Instant::now() + period),
    }
}

/// A recurring timer.
///
/// Ticks are scheduled on a fixed grid. When the owner falls behind by more
/// than one period, missed ticks are skipped rather than fired in a burst.
#[derive(Debug)]
pub struct Interval {
    period: Duration,
    sleep: Sleep,
}

impl Interval {
    /// Waits for the next tick and returns the instant it was scheduled for.
    pub async fn tick(&mut self) -> Instant {
        (&mut self.sleep).await;

        let scheduled = self.sleep.deadline();
        let mut next = scheduled + self.period;

        let now = Instant::now();
        if next <= now {
            next = now + self.period;
        }

        self.sleep.reset(next);
        scheduled
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}
