//! Navigation Configuration
//!
//! One parameter set drives the whole controller: cadence, distance thresholds,
//! speed profile, wheel correction, stuck policies, scan geometry and maneuver
//! timing. Robot variants differ only in these numbers, so each variant is a
//! `const` preset rather than its own program.
//!
//! # Presets
//! - [`NavigationConfig::FIVE_POINT`]: five-point sweep, the reference robot
//! - [`NavigationConfig::THREE_POINT`]: coarse three-point sweep, wider margins
//! - [`NavigationConfig::FINE_SWEEP`]: seven points every 30°
//!
//! # Turn calibration
//! Turns are open-loop: a fixed duration per angular offset, with no odometry.
//! The tables below were timed on one platform and will not transfer as-is.

use embassy_time::Duration;

use crate::error::ConfigError;
use crate::system::state::MAX_DISTANCE_CM;
use crate::task::drive::WheelCorrection;
use crate::task::scanner::MAX_SCAN_POINTS;

/// Distance bands in centimeters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DistanceThresholds {
    /// Above this the path is clear (cruise)
    pub safe_cm: u16,
    /// At or below this the path is blocked (avoid)
    pub critical_cm: u16,
    /// At or below this the robot has bumped into something (escape)
    pub bump_cm: u16,
    /// Above this (but not past `safe_cm`) near hits decay
    pub clear_cm: u16,
}

/// Speed bounds and ramp steps in duty units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpeedProfile {
    pub min: u8,
    pub max: u8,
    /// Spin-in-place speed
    pub turn: u8,
    /// Increment per clear sample
    pub accel_step: u8,
    /// Decrement per caution sample
    pub decel_step: u8,
}

impl SpeedProfile {
    /// Clamp a computed speed into `[min, max]`; `max` wins if the bounds are
    /// inverted
    pub fn clamp(&self, speed: u8) -> u8 {
        speed.max(self.min).min(self.max)
    }
}

/// Stuck detection parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StuckConfig {
    /// Readings differing by more than this count as a change
    pub noise_cm: u16,
    /// Near hits above this raise an escape
    pub near_hit_limit: u8,
    /// No-change cycles above this (while moving) may signal a blockage
    pub no_change_cycles: u16,
    /// ...provided the last change is also older than this
    pub no_change_time: Duration,
    /// Length of the stall window while moving
    pub stall_window: Duration,
    /// Fewer confirmed changes than this in one window signals a stall
    pub stall_min_changes: u16,
}

/// Sweep geometry and timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Requested mount angles in sweep order; clamped to 0-180 before use
    pub angles: &'static [i16],
    /// Forward-facing mount angle
    pub center: u8,
    /// Wait after pointing the mount before measuring
    pub settle: Duration,
    /// Wait after returning the mount to center
    pub return_settle: Duration,
    /// Readings averaged per scan angle
    pub precise_samples: u8,
    /// Pause after each averaged reading
    pub precise_pause: Duration,
}

/// Turn duration for offsets up to `max_offset` degrees from center
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TurnStep {
    pub max_offset: u8,
    pub duration: Duration,
}

/// Fixed durations of the maneuver phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManeuverTiming {
    /// Pause after stopping
    pub stop_pause: Duration,
    /// Pause after reversing and after escape turns
    pub settle_pause: Duration,
    /// Reverse leg of an avoidance
    pub avoid_reverse: Duration,
    /// Reverse leg of an escape
    pub escape_reverse: Duration,
    /// Reverse leg of a stall escape
    pub stall_reverse: Duration,
    /// Turn durations by offset, ascending `max_offset`
    pub turns: &'static [TurnStep],
    /// Roughly 180° spin when an escape finds only the forward bearing open
    pub turn_around: Duration,
    /// Pause between the startup orientation and the first drive command
    pub startup_pause: Duration,
}

impl ManeuverTiming {
    /// Open-loop turn duration for an offset from center; `None` for zero offset
    pub fn turn_duration(&self, offset: u8) -> Option<Duration> {
        if offset == 0 {
            return None;
        }
        self.turns
            .iter()
            .find(|step| offset <= step.max_offset)
            .or(self.turns.last())
            .map(|step| step.duration)
    }
}

/// Echo timing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SonarConfig {
    /// Give up waiting for the echo after this long
    pub echo_timeout: Duration,
    /// Sentinel for timeouts and implausible readings
    pub max_cm: u16,
}

/// Complete controller configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationConfig {
    /// Control loop period
    pub tick_period: Duration,
    /// Distance sampling period, coarser than the tick
    pub sample_period: Duration,
    pub thresholds: DistanceThresholds,
    pub speed: SpeedProfile,
    pub correction: WheelCorrection,
    pub stuck: StuckConfig,
    pub scan: ScanConfig,
    pub maneuver: ManeuverTiming,
    pub sonar: SonarConfig,
}

const FIVE_POINT_ANGLES: [i16; 5] = [0, 45, 90, 135, 180];
const FIVE_POINT_TURNS: [TurnStep; 2] = [
    TurnStep {
        max_offset: 45,
        duration: Duration::from_millis(250),
    },
    TurnStep {
        max_offset: 90,
        duration: Duration::from_millis(450),
    },
];

const THREE_POINT_ANGLES: [i16; 3] = [0, 90, 180];
const THREE_POINT_TURNS: [TurnStep; 1] = [TurnStep {
    max_offset: 90,
    duration: Duration::from_millis(500),
}];

const FINE_SWEEP_ANGLES: [i16; 7] = [0, 30, 60, 90, 120, 150, 180];
const FINE_SWEEP_TURNS: [TurnStep; 3] = [
    TurnStep {
        max_offset: 30,
        duration: Duration::from_millis(170),
    },
    TurnStep {
        max_offset: 60,
        duration: Duration::from_millis(300),
    },
    TurnStep {
        max_offset: 90,
        duration: Duration::from_millis(450),
    },
];

impl NavigationConfig {
    /// Five-point sweep (0/45/90/135/180), 25 cm safe, 15 cm critical
    pub const FIVE_POINT: Self = Self {
        tick_period: Duration::from_millis(10),
        sample_period: Duration::from_millis(150),
        thresholds: DistanceThresholds {
            safe_cm: 25,
            critical_cm: 15,
            bump_cm: 3,
            clear_cm: 20,
        },
        speed: SpeedProfile {
            min: 100,
            max: 160,
            turn: 120,
            accel_step: 5,
            decel_step: 60,
        },
        correction: WheelCorrection {
            left: 0.90,
            right: 1.0,
        },
        stuck: StuckConfig {
            noise_cm: 3,
            near_hit_limit: 3,
            no_change_cycles: 13,
            no_change_time: Duration::from_millis(2000),
            stall_window: Duration::from_millis(10_000),
            stall_min_changes: 5,
        },
        scan: ScanConfig {
            angles: &FIVE_POINT_ANGLES,
            center: 90,
            settle: Duration::from_millis(600),
            return_settle: Duration::from_millis(500),
            precise_samples: 3,
            precise_pause: Duration::from_millis(50),
        },
        maneuver: ManeuverTiming {
            stop_pause: Duration::from_millis(200),
            settle_pause: Duration::from_millis(300),
            avoid_reverse: Duration::from_millis(200),
            escape_reverse: Duration::from_millis(400),
            stall_reverse: Duration::from_millis(500),
            turns: &FIVE_POINT_TURNS,
            turn_around: Duration::from_millis(900),
            startup_pause: Duration::from_millis(1000),
        },
        sonar: SonarConfig {
            echo_timeout: Duration::from_millis(25),
            max_cm: MAX_DISTANCE_CM,
        },
    };

    /// Three-point sweep (0/90/180) with wider margins and a single turn length
    pub const THREE_POINT: Self = Self {
        thresholds: DistanceThresholds {
            safe_cm: 30,
            critical_cm: 20,
            bump_cm: 3,
            clear_cm: 25,
        },
        speed: SpeedProfile {
            min: 90,
            max: 150,
            turn: 120,
            accel_step: 5,
            decel_step: 60,
        },
        correction: WheelCorrection {
            left: 1.0,
            right: 1.0,
        },
        scan: ScanConfig {
            angles: &THREE_POINT_ANGLES,
            settle: Duration::from_millis(500),
            ..Self::FIVE_POINT.scan
        },
        maneuver: ManeuverTiming {
            turns: &THREE_POINT_TURNS,
            turn_around: Duration::from_millis(1000),
            ..Self::FIVE_POINT.maneuver
        },
        sonar: SonarConfig {
            echo_timeout: Duration::from_millis(30),
            max_cm: MAX_DISTANCE_CM,
        },
        ..Self::FIVE_POINT
    };

    /// Seven-point sweep every 30° with shorter servo settle
    pub const FINE_SWEEP: Self = Self {
        scan: ScanConfig {
            angles: &FINE_SWEEP_ANGLES,
            settle: Duration::from_millis(400),
            ..Self::FIVE_POINT.scan
        },
        maneuver: ManeuverTiming {
            turns: &FINE_SWEEP_TURNS,
            ..Self::FIVE_POINT.maneuver
        },
        ..Self::FIVE_POINT
    };

    /// Check the invariants the controller relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.speed.min > self.speed.max {
            return Err(ConfigError::SpeedRange);
        }
        let t = &self.thresholds;
        if !(t.bump_cm < t.critical_cm && t.critical_cm < t.clear_cm && t.clear_cm <= t.safe_cm) {
            return Err(ConfigError::Thresholds);
        }
        if self.scan.angles.is_empty() {
            return Err(ConfigError::EmptyScan);
        }
        if self.scan.angles.len() > MAX_SCAN_POINTS {
            return Err(ConfigError::TooManyScanAngles);
        }
        if self.scan.precise_samples == 0 {
            return Err(ConfigError::ZeroSamples);
        }
        if self.tick_period.as_ticks() == 0 || self.sample_period.as_ticks() == 0 {
            return Err(ConfigError::ZeroCadence);
        }
        if self.maneuver.turns.is_empty() {
            return Err(ConfigError::EmptyTurnTable);
        }
        Ok(())
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self::FIVE_POINT
    }
}
