//! Hardware Resource Management
//!
//! Allocates the robot's pins and peripherals to the navigation task.
//!
//! # Resource Groups
//! - Sonar: HC-SR04 trigger and echo pins
//! - Sweep servo: PIO-generated PWM for the sensor mount
//! - Motor driver: TB6612FNG standby, direction pins and PWM slices

use assign_resources::assign_resources;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::{self, PIO0};
use embassy_rp::pio::InterruptHandler as PioInterruptHandler;

assign_resources! {
    /// HC-SR04 ultrasonic distance sensor pins
    sonar: SonarResources {
       trigger_pin: PIN_15,
       echo_pin: PIN_14,
    },
    /// Servo the sonar is mounted on
    sweep_servo: SweepServoResources {
        pin: PIN_5,
        pio: PIO0,
    },
    /// TB6612FNG dual motor driver pins and PWM channels
    motor_driver: MotorDriverResources {
        standby_pin: PIN_22,
        // motor A, the left wheel
        left_slice: PWM_SLICE6,
        left_pwm_pin: PIN_28,
        left_forward_pin: PIN_21,
        left_backward_pin: PIN_20,
        // motor B, the right wheel
        right_slice: PWM_SLICE5,
        right_pwm_pin: PIN_27,
        right_forward_pin: PIN_19,
        right_backward_pin: PIN_18,
    },
}

bind_interrupts!(pub struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});
