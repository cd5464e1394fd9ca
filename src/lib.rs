//! Reactive navigation core for a two-wheel robot with a rotating ultrasonic
//! range sensor.
//!
//! The robot drives forward while the path is clear, slows down as an obstacle
//! approaches, and when it gets too close it backs off, sweeps the sensor
//! across several bearings and turns toward the most open one. A stuck
//! detector watches the distance stream for bumps, repeated near hits,
//! unseen blockages and stalls, and triggers a stronger escape maneuver.
//!
//! Hardware is reached only through small traits ([`RangeSensor`],
//! [`SensorMount`], [`MotionActuator`], [`Clock`]), so the same controller runs
//! on the RP2350 firmware and against the host [`sim`] harness.
//!
//! [`RangeSensor`]: task::range_sensor::RangeSensor
//! [`SensorMount`]: task::scanner::SensorMount
//! [`MotionActuator`]: task::drive::MotionActuator
//! [`Clock`]: system::clock::Clock

#![cfg_attr(not(any(test, feature = "std")), no_std)]

// must come first so the logging macros are visible everywhere
mod fmt;

pub mod error;
#[cfg(any(test, feature = "std"))]
pub mod sim;
/// Configuration, time source, state and command types
pub mod system;
/// Sensor, drive and navigation components
pub mod task;

pub use error::{ConfigError, Error, Result};
pub use system::config::NavigationConfig;
pub use system::motion_command::MotionCommand;
pub use system::state::{EscapeCause, NavigationState};
pub use task::navigate::NavigationController;
