//! Progressive acceleration
//!
//! Holds the commanded cruise speed. Clear samples step it up toward `max`,
//! approaching obstacles step it down toward `min`, and any maneuver drops it
//! straight back to `min`.

use crate::system::config::SpeedProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VelocityRamp {
    speed: u8,
    profile: SpeedProfile,
}

impl VelocityRamp {
    pub fn new(profile: SpeedProfile) -> Self {
        Self {
            speed: profile.min,
            profile,
        }
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// One clear-path step toward `max`, never overshooting
    pub fn accelerate(&mut self) -> u8 {
        self.speed = self
            .profile
            .clamp(self.speed.saturating_add(self.profile.accel_step));
        self.speed
    }

    /// One approaching-obstacle step toward `min`, never undershooting
    pub fn decelerate(&mut self) -> u8 {
        self.speed = self
            .profile
            .clamp(self.speed.saturating_sub(self.profile.decel_step));
        self.speed
    }

    pub fn reset(&mut self) {
        self.speed = self.profile.min;
    }
}
