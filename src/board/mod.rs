//! Board support for the RP2350 robot: pin assignment and the PIO servo
pub mod resources;
pub mod servo;
