//! Motion Command Module
//!
//! Drive primitives issued by the navigation controller and the per-wheel
//! directions they translate to.

/// Drive primitive with its speed magnitude (duty units, 0-255)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionCommand {
    /// Both wheels forward
    Forward(u8),
    /// Both wheels backward
    Reverse(u8),
    /// Spin in place to the left: left wheel back, right wheel forward
    TurnLeft(u8),
    /// Spin in place to the right: left wheel forward, right wheel back
    TurnRight(u8),
    /// Release both wheels, zero duty
    Stop,
}

/// Direction signal for one wheel channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WheelDirection {
    Forward,
    Backward,
    /// Both direction lines low, freewheeling
    Coast,
}

impl MotionCommand {
    /// Speed magnitude, `None` for [`MotionCommand::Stop`]
    pub fn speed(&self) -> Option<u8> {
        match *self {
            MotionCommand::Forward(s)
            | MotionCommand::Reverse(s)
            | MotionCommand::TurnLeft(s)
            | MotionCommand::TurnRight(s) => Some(s),
            MotionCommand::Stop => None,
        }
    }

    /// (left, right) wheel directions for this primitive
    pub fn wheel_directions(&self) -> (WheelDirection, WheelDirection) {
        use WheelDirection::*;
        match self {
            MotionCommand::Forward(_) => (Forward, Forward),
            MotionCommand::Reverse(_) => (Backward, Backward),
            MotionCommand::TurnLeft(_) => (Backward, Forward),
            MotionCommand::TurnRight(_) => (Forward, Backward),
            MotionCommand::Stop => (Coast, Coast),
        }
    }
}
