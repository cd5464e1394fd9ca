//! Robot firmware entry point
//!
//! Initializes the board and hands it to the navigation controller.

#![no_std]
#![no_main]

use board::resources::{
    AssignedResources, Irqs, MotorDriverResources, SonarResources, SweepServoResources,
};
use board::servo::ServoBuilder;
use core::time::Duration;
use defmt::info;
use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use embassy_rp::config::Config;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::pio::Pio;
use embassy_rp::pio_programs::pwm::{PioPwm, PioPwmProgram};
use embassy_rp::pwm;
use sonar_rover::system::clock::SystemClock;
use sonar_rover::task::drive::DifferentialDrive;
use sonar_rover::task::range_sensor::{EchoPins, Sonar};
use sonar_rover::{NavigationConfig, NavigationController};
use tb6612fng::Motor;
use {defmt_rtt as _, panic_probe as _};

/// Firmware image type for bootloader
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

/// Pin assignment and servo driver
mod board;

/// Firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Config::default());

    // Split the resources into separate groups for each part of the robot
    let r = split_resources!(p);

    spawner
        .spawn(navigate(r.sonar, r.sweep_servo, r.motor_driver))
        .unwrap();
}

/// Runs the navigation loop forever.
///
/// The controller blocks on every wait, so it owns the executor once started.
#[embassy_executor::task]
async fn navigate(s: SonarResources, v: SweepServoResources, m: MotorDriverResources) {
    let config = NavigationConfig::FIVE_POINT;

    // HC-SR04 on a PIO-driven servo
    let trigger = Output::new(s.trigger_pin, Level::Low);
    let echo = Input::new(s.echo_pin, Pull::None);
    let sonar = Sonar::new(EchoPins::new(trigger, echo, embassy_time::Delay), config.sonar);

    let Pio {
        mut common, sm0, ..
    } = Pio::new(v.pio, Irqs);
    let prg = PioPwmProgram::new(&mut common);
    let pwm_pio = PioPwm::new(&mut common, sm0, v.pin, &prg);
    let servo = ServoBuilder::new(pwm_pio)
        .set_max_degree_rotation(180)
        .set_min_pulse_width(Duration::from_micros(500)) // This value was detemined by a rough experiment.
        .set_max_pulse_width(Duration::from_micros(2400)) // Along with this value.
        .build();

    // We use 10kHz frequency as cheaper DC motors often work better at lower frequencies
    let desired_freq_hz = 10_000;
    let clock_freq_hz = embassy_rp::clocks::clk_sys_freq(); // 150MHz

    // Calculate minimum divider needed to keep period under 16-bit limit (65535)
    let divider = ((clock_freq_hz / desired_freq_hz) / 65535 + 1) as u8;
    let period = (clock_freq_hz / (desired_freq_hz * divider as u32)) as u16 - 1;

    let mut pwm_config = pwm::Config::default();
    pwm_config.divider = divider.into();
    pwm_config.top = period;

    // standby held high for as long as the task runs
    let _standby = Output::new(m.standby_pin, Level::High);

    // motor A, here defined to be the left motor
    let left_fwd = Output::new(m.left_forward_pin, Level::Low);
    let left_bckw = Output::new(m.left_backward_pin, Level::Low);
    let left_pwm = pwm::Pwm::new_output_a(m.left_slice, m.left_pwm_pin, pwm_config.clone());
    let left_motor = Motor::new(left_fwd, left_bckw, left_pwm).unwrap();

    // motor B, here defined to be the right motor
    let right_fwd = Output::new(m.right_forward_pin, Level::Low);
    let right_bckw = Output::new(m.right_backward_pin, Level::Low);
    let right_pwm = pwm::Pwm::new_output_b(m.right_slice, m.right_pwm_pin, pwm_config.clone());
    let right_motor = Motor::new(right_fwd, right_bckw, right_pwm).unwrap();

    let drive = DifferentialDrive::new(left_motor, right_motor, config.correction, config.speed);

    info!("navigation starting");
    let mut controller = match NavigationController::new(config, sonar, servo, drive, SystemClock) {
        Ok(controller) => controller,
        Err(e) => defmt::panic!("navigation config rejected: {}", e),
    };
    controller.run()
}
