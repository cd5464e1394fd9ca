//! Error types
//!
//! Only construction can fail. Everything that goes wrong inside the control
//! loop is absorbed where it is detected and turned into a safe value.

use core::fmt;

/// Crate-wide result alias
pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced by the navigation core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The navigation configuration is inconsistent
    InvalidConfig(ConfigError),
    /// A wheel driver rejected a direction or duty update
    Wheel,
}

/// Reasons a [`NavigationConfig`](crate::system::config::NavigationConfig) is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// `min` speed is above `max` speed
    SpeedRange,
    /// Distance thresholds are not ordered `bump < critical < clear <= safe`
    Thresholds,
    /// No scan angles configured
    EmptyScan,
    /// More scan angles than a scan result can hold
    TooManyScanAngles,
    /// Precise measurement averages zero samples
    ZeroSamples,
    /// Tick or sample period is zero
    ZeroCadence,
    /// No turn durations configured
    EmptyTurnTable,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(e) => write!(f, "invalid navigation config: {}", e),
            Error::Wheel => f.write_str("wheel driver write failed"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ConfigError::SpeedRange => "minimum speed exceeds maximum speed",
            ConfigError::Thresholds => "distance thresholds must satisfy bump < critical < clear <= safe",
            ConfigError::EmptyScan => "scan angle set is empty",
            ConfigError::TooManyScanAngles => "scan angle set exceeds scan result capacity",
            ConfigError::ZeroSamples => "precise measurement needs at least one sample",
            ConfigError::ZeroCadence => "tick and sample periods must be non-zero",
            ConfigError::EmptyTurnTable => "turn duration table is empty",
        };
        f.write_str(msg)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::InvalidConfig(e)
    }
}
