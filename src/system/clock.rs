//! Time source for the control loop
//!
//! Every wait in the core (sample cadence, servo settle, maneuver durations) is
//! a synchronous call on a [`Clock`]. While a maneuver runs nothing else is
//! decided, so the controller's notion of "now" only moves through this trait.

use embassy_time::{Duration, Instant};

/// Monotonic time plus a blocking delay
pub trait Clock {
    /// Current time
    fn now(&self) -> Instant;

    /// Block for `duration`
    fn delay(&mut self, duration: Duration);
}

/// Clock backed by the embassy time driver
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn delay(&mut self, duration: Duration) {
        embassy_time::block_for(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn delay(&mut self, duration: Duration) {
        (**self).delay(duration)
    }
}
