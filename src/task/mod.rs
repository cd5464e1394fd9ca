pub mod drive;
pub mod navigate;
pub mod range_sensor;
pub mod scanner;
pub mod stuck_detect;
pub mod velocity_ramp;
