//! Host simulation harness
//!
//! Deterministic stand-ins for the hardware so the controller can be driven
//! tick by tick on a host:
//!
//! - [`VirtualClock`]: time only moves when something delays
//! - [`SimulatedSonar`] + [`SimulatedMount`]: readings facing forward replay a
//!   script, readings at other mount angles come from a fixed view
//! - [`RecordingActuator`]: timestamped log of every motion command
//! - [`RecordingWheel`]: raw direction/duty log for one wheel channel
//!
//! # Usage
//!
//! ```rust,ignore
//! let clock = VirtualClock::new();
//! let (mut sonar, mount) = sim::sonar_rig(90);
//! sonar.push_forward([50, 48, 46, 5]);
//! sonar.set_view(&[(0, 30), (45, 120), (135, 60), (180, 20)]);
//! let drive = RecordingActuator::new(clock.clone());
//! let mut nav = NavigationController::new(config, sonar, mount, drive, clock.clone())?;
//! let tick = nav.step();
//! ```

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use embassy_time::{Duration, Instant};
use nanorand::{Rng, WyRand};

use crate::error::Error;
use crate::system::clock::Clock;
use crate::system::motion_command::{MotionCommand, WheelDirection};
use crate::system::state::MAX_DISTANCE_CM;
use crate::task::drive::{MotionActuator, Wheel};
use crate::task::range_sensor::RangeSensor;
use crate::task::scanner::SensorMount;

/// Shared virtual time; clones observe and advance the same clock
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    micros: Rc<Cell<u64>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        self.micros.set(self.micros.get() + duration.as_micros());
    }

    /// Time since the clock was created
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.micros.get())
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.micros.get())
    }

    fn delay(&mut self, duration: Duration) {
        self.advance(duration);
    }
}

/// Range sensor that knows where its mount is pointing
pub struct SimulatedSonar {
    angle: Rc<Cell<u8>>,
    center: u8,
    forward: VecDeque<u16>,
    view: Vec<(u8, u16)>,
    fallback: u16,
    jitter: Option<(WyRand, u16)>,
    reads: usize,
}

/// Servo mount sharing its angle with a [`SimulatedSonar`]
pub struct SimulatedMount {
    angle: Rc<Cell<u8>>,
    history: Vec<u8>,
}

/// A sonar and mount pair, mount facing `center`
pub fn sonar_rig(center: u8) -> (SimulatedSonar, SimulatedMount) {
    let angle = Rc::new(Cell::new(center));
    let sonar = SimulatedSonar {
        angle: angle.clone(),
        center,
        forward: VecDeque::new(),
        view: Vec::new(),
        fallback: MAX_DISTANCE_CM,
        jitter: None,
        reads: 0,
    };
    let mount = SimulatedMount {
        angle,
        history: Vec::new(),
    };
    (sonar, mount)
}

impl SimulatedSonar {
    /// Queue readings for when the mount faces forward
    pub fn push_forward(&mut self, readings: impl IntoIterator<Item = u16>) {
        self.forward.extend(readings);
    }

    /// Fixed readings for off-center mount angles
    pub fn set_view(&mut self, view: &[(u8, u16)]) {
        self.view = view.to_vec();
    }

    /// Reading once the forward script runs out, and for angles not in the view
    pub fn set_fallback(&mut self, distance_cm: u16) {
        self.fallback = distance_cm;
    }

    /// Add seeded uniform noise of up to `amplitude` cm either way
    pub fn set_jitter(&mut self, seed: u64, amplitude: u16) {
        self.jitter = Some((WyRand::new_seed(seed), amplitude));
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn forward_remaining(&self) -> usize {
        self.forward.len()
    }
}

impl RangeSensor for SimulatedSonar {
    fn measure(&mut self) -> u16 {
        self.reads += 1;
        let angle = self.angle.get();
        let base = if angle == self.center {
            self.forward.pop_front().unwrap_or(self.fallback)
        } else {
            self.view
                .iter()
                .find(|(a, _)| *a == angle)
                .map_or(self.fallback, |&(_, d)| d)
        };
        let noisy = match &mut self.jitter {
            Some((rng, amplitude)) => {
                let offset = rng.generate_range(0..=2 * *amplitude);
                (base + offset).saturating_sub(*amplitude)
            }
            None => base,
        };
        noisy.min(MAX_DISTANCE_CM)
    }
}

impl SimulatedMount {
    /// Every angle commanded so far
    pub fn history(&self) -> &[u8] {
        &self.history
    }

    pub fn angle(&self) -> u8 {
        self.angle.get()
    }
}

impl SensorMount for SimulatedMount {
    fn point(&mut self, angle: u8) {
        self.angle.set(angle);
        self.history.push(angle);
    }
}

/// Actuator that logs commands against virtual time
pub struct RecordingActuator {
    clock: VirtualClock,
    commands: Vec<(Instant, MotionCommand)>,
}

impl RecordingActuator {
    pub fn new(clock: VirtualClock) -> Self {
        Self {
            clock,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[(Instant, MotionCommand)] {
        &self.commands
    }

    pub fn last(&self) -> Option<MotionCommand> {
        self.commands.last().map(|&(_, c)| c)
    }
}

impl MotionActuator for RecordingActuator {
    fn execute(&mut self, command: MotionCommand) {
        self.commands.push((self.clock.now(), command));
    }
}

/// Wheel channel that logs what it was told
#[derive(Debug, Default)]
pub struct RecordingWheel {
    history: Vec<(WheelDirection, u8)>,
    failing: bool,
}

impl RecordingWheel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A wheel whose driver rejects every write
    pub fn failing() -> Self {
        Self {
            history: Vec::new(),
            failing: true,
        }
    }

    pub fn history(&self) -> &[(WheelDirection, u8)] {
        &self.history
    }

    pub fn last(&self) -> Option<(WheelDirection, u8)> {
        self.history.last().copied()
    }
}

impl Wheel for RecordingWheel {
    fn set(&mut self, direction: WheelDirection, duty: u8) -> Result<(), Error> {
        if self.failing {
            return Err(Error::Wheel);
        }
        self.history.push((direction, duty));
        Ok(())
    }
}
