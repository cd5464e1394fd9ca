//! Drive Module
//!
//! Turns motion commands into per-wheel direction and duty signals for a
//! two-wheel differential drive.
//!
//! # Wheel Correction
//!
//! One motor is usually a little faster than the other. Each wheel has a
//! correction factor (0.5 to 1.5) applied as a multiplier to the commanded
//! speed before it becomes a duty value, so straight commands drive straight.
//!
//! # Speed Limits
//!
//! Every directional command is clamped into `[min, max]` of the speed profile
//! before correction. `stop()` releases both wheels with zero duty. The drive
//! keeps no state between commands, so repeating a command changes nothing.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use tb6612fng::{DriveCommand, Motor};

use crate::error::Error;
use crate::system::config::SpeedProfile;
use crate::system::motion_command::{MotionCommand, WheelDirection};

/// Left or right side of the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WheelSide {
    Left,
    Right,
}

/// The five drive primitives
pub trait MotionActuator {
    fn execute(&mut self, command: MotionCommand);

    fn forward(&mut self, speed: u8) {
        self.execute(MotionCommand::Forward(speed));
    }

    fn reverse(&mut self, speed: u8) {
        self.execute(MotionCommand::Reverse(speed));
    }

    fn turn_left(&mut self, speed: u8) {
        self.execute(MotionCommand::TurnLeft(speed));
    }

    fn turn_right(&mut self, speed: u8) {
        self.execute(MotionCommand::TurnRight(speed));
    }

    fn stop(&mut self) {
        self.execute(MotionCommand::Stop);
    }
}

impl<A: MotionActuator + ?Sized> MotionActuator for &mut A {
    fn execute(&mut self, command: MotionCommand) {
        (**self).execute(command)
    }
}

/// One wheel channel: a direction signal and a duty magnitude (0-255)
pub trait Wheel {
    fn set(&mut self, direction: WheelDirection, duty: u8) -> Result<(), Error>;
}

/// TB6612FNG channel as a wheel. Duty 0-255 maps onto the driver's 0-100%.
impl<IN1, IN2, PWM> Wheel for Motor<IN1, IN2, PWM>
where
    IN1: OutputPin,
    IN2: OutputPin,
    PWM: SetDutyCycle,
{
    fn set(&mut self, direction: WheelDirection, duty: u8) -> Result<(), Error> {
        let percent = (u16::from(duty) * 100 / 255) as u8;
        let command = match direction {
            WheelDirection::Forward => DriveCommand::Forward(percent),
            WheelDirection::Backward => DriveCommand::Backward(percent),
            WheelDirection::Coast => DriveCommand::Stop,
        };
        self.drive(command).map_err(|_| Error::Wheel)
    }
}

/// Per-wheel speed correction factors
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WheelCorrection {
    pub left: f32,
    pub right: f32,
}

impl Default for WheelCorrection {
    fn default() -> Self {
        Self {
            left: 1.0,
            right: 1.0,
        }
    }
}

impl WheelCorrection {
    /// Clamp correction factor to somewhat safe range
    const MIN_FACTOR: f32 = 0.5;
    const MAX_FACTOR: f32 = 1.5;

    /// Create a correction with both factors clamped
    pub fn new(left: f32, right: f32) -> Self {
        Self {
            left: Self::clamp_factor(left),
            right: Self::clamp_factor(right),
        }
    }

    fn clamp_factor(factor: f32) -> f32 {
        let clamped = factor.clamp(Self::MIN_FACTOR, Self::MAX_FACTOR);
        if clamped != factor {
            warn!("correction factor {} clamped to {}", factor, clamped);
        }
        clamped
    }

    pub fn factor(&self, side: WheelSide) -> f32 {
        match side {
            WheelSide::Left => self.left,
            WheelSide::Right => self.right,
        }
    }

    /// Apply the side's factor to a speed, rounded and clamped to a duty value
    pub fn apply(&self, side: WheelSide, speed: u8) -> u8 {
        let corrected = libm::roundf(f32::from(speed) * self.factor(side));
        corrected.clamp(0.0, 255.0) as u8
    }
}

/// Two-wheel drive with correction and speed clamping
pub struct DifferentialDrive<L, R> {
    left: L,
    right: R,
    correction: WheelCorrection,
    limits: SpeedProfile,
}

impl<L: Wheel, R: Wheel> DifferentialDrive<L, R> {
    pub fn new(left: L, right: R, correction: WheelCorrection, limits: SpeedProfile) -> Self {
        Self {
            left,
            right,
            correction: WheelCorrection::new(correction.left, correction.right),
            limits,
        }
    }

    pub fn left(&self) -> &L {
        &self.left
    }

    pub fn right(&self) -> &R {
        &self.right
    }

    fn clamp_speed(&self, speed: u8) -> u8 {
        let clamped = self.limits.clamp(speed);
        if clamped != speed {
            warn!("speed {} clamped to {}", speed, clamped);
        }
        clamped
    }
}

impl<L: Wheel, R: Wheel> MotionActuator for DifferentialDrive<L, R> {
    fn execute(&mut self, command: MotionCommand) {
        let (left_dir, right_dir) = command.wheel_directions();
        let (left_duty, right_duty) = match command.speed() {
            Some(speed) => {
                let speed = self.clamp_speed(speed);
                (
                    self.correction.apply(WheelSide::Left, speed),
                    self.correction.apply(WheelSide::Right, speed),
                )
            }
            None => (0, 0),
        };

        debug!("{:?} -> left {} right {}", command, left_duty, right_duty);

        if self.left.set(left_dir, left_duty).is_err() {
            warn!("left wheel rejected {:?}", command);
        }
        if self.right.set(right_dir, right_duty).is_err() {
            warn!("right wheel rejected {:?}", command);
        }
    }
}
