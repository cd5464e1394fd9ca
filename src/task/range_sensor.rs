//! Distance sensor handling
//!
//! Turns HC-SR04 echo pulses into distances in centimeters.
//!
//! # Sensor Operation
//! - A 10µs trigger pulse starts a ranging cycle
//! - The echo line stays high for the round-trip time of the sound pulse
//! - Sound travels 0.034 cm/µs, so distance is `echo_µs * 0.034 / 2`
//!
//! # Error Handling
//! - No echo within the timeout, a zero reading or anything beyond 400cm
//!   reads as 400cm (clear path)
//! - This is permissive: a sensor that keeps timing out (loose wire, sensor
//!   facing the sky) looks exactly like open space and the robot will drive
//!   into whatever is actually there. It is kept this way on purpose and shows
//!   up in the controller tests; callers wanting the opposite policy can wrap
//!   the sensor.
//! - A silent sensor also never changes its reading, so while driving the stuck
//!   detector sees an unseen blockage and escapes every few seconds (the first
//!   after about 2.1s with the default config). Open space past 400cm looks
//!   exactly the same.

use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use moving_median::MovingMedian;

use crate::system::clock::Clock;
use crate::system::config::SonarConfig;
use crate::system::state::MAX_DISTANCE_CM;

/// Speed of sound in cm per microsecond
const SOUND_CM_PER_US: f32 = 0.034;

/// Anything that reports a distance in centimeters within `0..=400`
pub trait RangeSensor {
    /// Take one reading
    fn measure(&mut self) -> u16;

    /// Average `samples` readings, pausing after each one
    fn measure_precise<C: Clock>(&mut self, clock: &mut C, samples: u8, pause: Duration) -> u16 {
        let samples = samples.max(1);
        let mut sum: u32 = 0;
        for _ in 0..samples {
            sum += u32::from(self.measure());
            clock.delay(pause);
        }
        (sum / u32::from(samples)) as u16
    }
}

impl<S: RangeSensor + ?Sized> RangeSensor for &mut S {
    fn measure(&mut self) -> u16 {
        (**self).measure()
    }
}

/// Trigger/echo pulse timing, the hardware side of the sensor
pub trait PulseEcho {
    /// Fire a trigger pulse and return how long the echo line stayed high,
    /// or `None` when no complete echo arrived within `timeout`
    fn echo(&mut self, timeout: Duration) -> Option<Duration>;
}

/// Ultrasonic range sensor: echo timing plus conversion and clamping
pub struct Sonar<P> {
    pulse: P,
    config: SonarConfig,
}

impl<P: PulseEcho> Sonar<P> {
    pub fn new(pulse: P, config: SonarConfig) -> Self {
        Self { pulse, config }
    }

    /// Convert an echo duration to centimeters, clamping zero and implausible
    /// readings to `max_cm`
    pub fn echo_to_cm(echo: Duration, max_cm: u16) -> u16 {
        let cm = (echo.as_micros() as f32 * SOUND_CM_PER_US / 2.0) as u32;
        if cm == 0 || cm > u32::from(max_cm) {
            max_cm
        } else {
            cm as u16
        }
    }
}

impl<P: PulseEcho> RangeSensor for Sonar<P> {
    fn measure(&mut self) -> u16 {
        let max_cm = self.config.max_cm.min(MAX_DISTANCE_CM);
        match self.pulse.echo(self.config.echo_timeout) {
            Some(echo) => Self::echo_to_cm(echo, max_cm),
            None => {
                debug!("echo timeout, reading as {} cm", max_cm);
                max_cm
            }
        }
    }
}

/// HC-SR04 wiring: trigger output, echo input and a delay for the trigger pulse
pub struct EchoPins<T, E, D> {
    trigger: T,
    echo: E,
    delay: D,
}

impl<T, E, D> EchoPins<T, E, D>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
{
    pub fn new(trigger: T, echo: E, delay: D) -> Self {
        Self { trigger, echo, delay }
    }

    /// Busy-wait until the echo line reads `level` or the deadline passes
    fn wait_for(&mut self, level: bool, deadline: Instant) -> bool {
        loop {
            // a pin read error counts as "not there yet"
            if self.echo.is_high().map(|high| high == level).unwrap_or(false) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
        }
    }
}

impl<T, E, D> PulseEcho for EchoPins<T, E, D>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
{
    fn echo(&mut self, timeout: Duration) -> Option<Duration> {
        let _ = self.trigger.set_low();
        self.delay.delay_us(2);
        let _ = self.trigger.set_high();
        self.delay.delay_us(10);
        let _ = self.trigger.set_low();

        let deadline = Instant::now() + timeout;
        if !self.wait_for(true, deadline) {
            return None;
        }
        let rise = Instant::now();
        if !self.wait_for(false, deadline) {
            return None;
        }
        Some(Instant::now().saturating_duration_since(rise))
    }
}

/// Moving-median wrapper for sensors with spiky echoes
///
/// Window of 3 is a good balance between noise rejection and latency.
pub struct MedianFiltered<S, const N: usize> {
    inner: S,
    window: MovingMedian<f64, N>,
}

impl<S: RangeSensor, const N: usize> MedianFiltered<S, N> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            window: MovingMedian::<f64, N>::new(),
        }
    }
}

impl<S: RangeSensor, const N: usize> RangeSensor for MedianFiltered<S, N> {
    fn measure(&mut self) -> u16 {
        self.window.add_value(f64::from(self.inner.measure()));
        (self.window.median() as u16).min(MAX_DISTANCE_CM)
    }
}
