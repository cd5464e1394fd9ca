//! Sweep servo on PIO PWM
//!
//! The Pico's PWM slices all go to the motor driver, so the servo signal is
//! generated by a PIO state machine instead.

use core::time::Duration;

use embassy_rp::pio::Instance;
use embassy_rp::pio_programs::pwm::PioPwm;
use sonar_rover::task::scanner::{SensorMount, MAX_ANGLE};

const DEFAULT_MIN_PULSE_WIDTH: u64 = 1000; // uncalibrated default, the shortest duty cycle sent to a servo
const DEFAULT_MAX_PULSE_WIDTH: u64 = 2000; // uncalibrated default, the longest duty cycle sent to a servo
const DEFAULT_MAX_DEGREE_ROTATION: u16 = 160; // 160 degrees is typical
const REFRESH_INTERVAL: u64 = 20000; // The period of each cycle

pub struct ServoBuilder<'d, T: Instance, const SM: usize> {
    pwm: PioPwm<'d, T, SM>,
    period: Duration,
    min_pulse_width: Duration,
    max_pulse_width: Duration,
    max_degree_rotation: u16,
}

impl<'d, T: Instance, const SM: usize> ServoBuilder<'d, T, SM> {
    pub fn new(pwm: PioPwm<'d, T, SM>) -> Self {
        Self {
            pwm,
            period: Duration::from_micros(REFRESH_INTERVAL),
            min_pulse_width: Duration::from_micros(DEFAULT_MIN_PULSE_WIDTH),
            max_pulse_width: Duration::from_micros(DEFAULT_MAX_PULSE_WIDTH),
            max_degree_rotation: DEFAULT_MAX_DEGREE_ROTATION,
        }
    }

    pub fn set_min_pulse_width(mut self, duration: Duration) -> Self {
        self.min_pulse_width = duration;
        self
    }

    pub fn set_max_pulse_width(mut self, duration: Duration) -> Self {
        self.max_pulse_width = duration;
        self
    }

    pub fn set_max_degree_rotation(mut self, degree: u16) -> Self {
        self.max_degree_rotation = degree.max(1);
        self
    }

    /// Configure the period and start emitting pulses
    pub fn build(mut self) -> Servo<'d, T, SM> {
        self.pwm.set_period(self.period);
        self.pwm.start();
        Servo {
            pwm: self.pwm,
            min_pulse_width: self.min_pulse_width,
            max_pulse_width: self.max_pulse_width,
            max_degree_rotation: self.max_degree_rotation,
        }
    }
}

pub struct Servo<'d, T: Instance, const SM: usize> {
    pwm: PioPwm<'d, T, SM>,
    min_pulse_width: Duration,
    max_pulse_width: Duration,
    max_degree_rotation: u16,
}

impl<'d, T: Instance, const SM: usize> Servo<'d, T, SM> {
    /// Pulse width for an angle, linear between min and max pulse width
    fn pulse_width(&self, degree: u16) -> Duration {
        let degree = u64::from(degree.min(self.max_degree_rotation));
        let min = self.min_pulse_width.as_nanos() as u64;
        let span = (self.max_pulse_width.as_nanos() as u64).saturating_sub(min);
        let width = Duration::from_nanos(min + span * degree / u64::from(self.max_degree_rotation));
        width.min(self.max_pulse_width)
    }

    pub fn rotate(&mut self, degree: u16) {
        let duration = self.pulse_width(degree);
        defmt::debug!("servo {}° pulse {} us", degree, duration.as_micros() as u64);
        self.pwm.write(duration);
    }
}

impl<'d, T: Instance, const SM: usize> SensorMount for Servo<'d, T, SM> {
    fn point(&mut self, angle: u8) {
        self.rotate(u16::from(angle.min(MAX_ANGLE)));
    }
}
