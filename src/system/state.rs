//! Navigation State
//!
//! Values owned by the navigation controller: the state machine position, the
//! stuck detector counters and the per-sample status snapshot.
//!
//! # States
//! - `Cruising`: path clear beyond the safe threshold, ramping up
//! - `Caution`: obstacle between critical and safe thresholds, slowing down
//! - `Blocked`: obstacle at or inside the critical threshold, avoidance maneuver
//! - `Escaping`: a stuck policy fired, escape maneuver

use embassy_time::Instant;

/// Largest distance the sensor reports; also the timeout sentinel
pub const MAX_DISTANCE_CM: u16 = 400;

/// One polled distance reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DistanceSample {
    /// Distance in centimeters, always within `0..=400`
    pub value_cm: u16,
    /// When the reading was taken
    pub timestamp: Instant,
}

impl DistanceSample {
    pub fn new(value_cm: u16, timestamp: Instant) -> Self {
        Self {
            value_cm: value_cm.min(MAX_DISTANCE_CM),
            timestamp,
        }
    }
}

/// Position of the navigation state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NavigationState {
    #[default]
    Cruising,
    Caution,
    Blocked,
    Escaping,
}

/// Which stuck policy raised an escape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EscapeCause {
    /// Reading at or below the bump threshold
    ImmediateBump,
    /// Too many consecutive readings inside the critical band
    NearHits,
    /// Moving, yet the reading has not changed for too many cycles and too long
    Blockage,
    /// Moving for a whole stall window with too few confirmed changes
    Stall,
}

impl EscapeCause {
    /// Blockage and stall mean the forward reading cannot be trusted, so a clear
    /// center bearing still calls for turning around
    pub fn turns_around(&self) -> bool {
        matches!(self, EscapeCause::Blockage | EscapeCause::Stall)
    }
}

/// Stuck detector counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StuckCounters {
    /// Consecutive readings inside the critical band, decays when clear
    pub near_hits: u8,
    /// Consecutive readings within the noise threshold of their predecessor
    pub no_change_cycles: u16,
    /// Confirmed changes since the current stall window opened
    pub changes: u16,
    /// Last time a reading moved by more than the noise threshold
    pub last_change: Instant,
    /// Start of the current stall window, `None` while not moving
    pub moving_since: Option<Instant>,
}

impl StuckCounters {
    pub fn new(now: Instant) -> Self {
        Self {
            near_hits: 0,
            no_change_cycles: 0,
            changes: 0,
            last_change: now,
            moving_since: None,
        }
    }

    /// All counters at their initial values
    pub fn is_clear(&self) -> bool {
        self.near_hits == 0
            && self.no_change_cycles == 0
            && self.changes == 0
            && self.moving_since.is_none()
    }
}

/// Snapshot for the diagnostic status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NavigationStatus {
    pub state: NavigationState,
    pub distance_cm: u16,
    pub speed: u8,
    pub near_hits: u8,
    pub no_change_cycles: u16,
    pub changes: u16,
}
