//! Shared types: configuration, time source, navigation state and motion commands
pub mod clock;
pub mod config;
pub mod motion_command;
pub mod state;
