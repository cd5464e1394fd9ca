//! Autonomous navigation
//!
//! The controller owns every piece of mutable control state (velocity ramp,
//! stuck counters, navigation state) and runs one strictly sequential step per
//! control tick: measure (when a sample is due), classify, transition, actuate.
//!
//! # States
//! - `Cruising` (distance > safe): ramp up, drive forward
//! - `Caution` (critical < distance <= safe): ramp down, drive forward
//! - `Blocked` (distance <= critical): stop, back off, sweep, turn, resume
//! - `Escaping` (any stuck policy): stop, back off longer, sweep, turn (or turn
//!   around), reset all counters, resume
//!
//! Maneuvers block until they finish. There is no terminal state; [`run`]
//! never returns.
//!
//! [`run`]: NavigationController::run

use embassy_time::{Duration, Instant};

use crate::error::Error;
use crate::system::clock::Clock;
use crate::system::config::NavigationConfig;
use crate::system::state::{
    DistanceSample, EscapeCause, NavigationState, NavigationStatus, StuckCounters,
    MAX_DISTANCE_CM,
};
use crate::task::drive::MotionActuator;
use crate::task::range_sensor::RangeSensor;
use crate::task::scanner::{choose_best_angle, DirectionalScanner, ScanResult, SensorMount};
use crate::task::stuck_detect::StuckDetector;
use crate::task::velocity_ramp::VelocityRamp;

#[cfg(test)]
mod tests;

/// Turn chosen after a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Heading {
    /// Keep the current heading
    Straight,
    /// Spin left for the given time
    Left(Duration),
    /// Spin right for the given time
    Right(Duration),
}

/// Why a maneuver ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ManeuverKind {
    /// Startup orientation
    Orient,
    /// Obstacle inside the critical threshold
    Avoid,
    /// A stuck policy fired
    Escape(EscapeCause),
}

/// Outcome of a sweep-and-turn maneuver
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ManeuverReport {
    pub kind: ManeuverKind,
    pub scan: ScanResult,
    pub best_angle: u8,
    pub heading: Heading,
}

/// What one control tick did
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tick {
    /// State the tick acted in
    pub state: NavigationState,
    /// Sample taken this tick, if one was due
    pub sample: Option<DistanceSample>,
    /// Status line logged with the sample, after the state was decided
    pub status: Option<NavigationStatus>,
    /// Maneuver run this tick, if any
    pub maneuver: Option<ManeuverReport>,
}

pub struct NavigationController<S, M, A, C> {
    config: NavigationConfig,
    sensor: S,
    scanner: DirectionalScanner<M>,
    drive: A,
    clock: C,
    state: NavigationState,
    ramp: VelocityRamp,
    detector: StuckDetector,
    distance: u16,
    next_sample_at: Option<Instant>,
}

impl<S, M, A, C> NavigationController<S, M, A, C>
where
    S: RangeSensor,
    M: SensorMount,
    A: MotionActuator,
    C: Clock,
{
    /// Build the controller, rejecting an inconsistent configuration
    pub fn new(config: NavigationConfig, sensor: S, mount: M, drive: A, clock: C) -> Result<Self, Error> {
        config.validate()?;
        let now = clock.now();
        Ok(Self {
            sensor,
            scanner: DirectionalScanner::new(mount, i16::from(config.scan.center)),
            drive,
            clock,
            state: NavigationState::Cruising,
            ramp: VelocityRamp::new(config.speed),
            detector: StuckDetector::new(config.stuck, config.thresholds, now),
            distance: MAX_DISTANCE_CM,
            next_sample_at: None,
            config,
        })
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn speed(&self) -> u8 {
        self.ramp.speed()
    }

    /// Last sampled forward distance
    pub fn distance(&self) -> u16 {
        self.distance
    }

    pub fn counters(&self) -> &StuckCounters {
        self.detector.counters()
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn mount(&self) -> &M {
        self.scanner.mount()
    }

    pub fn drive(&self) -> &A {
        &self.drive
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn status(&self) -> NavigationStatus {
        let counters = self.detector.counters();
        NavigationStatus {
            state: self.state,
            distance_cm: self.distance,
            speed: self.ramp.speed(),
            near_hits: counters.near_hits,
            no_change_cycles: counters.no_change_cycles,
            changes: counters.changes,
        }
    }

    /// Orient toward the most open bearing before the first tick
    pub fn start(&mut self) -> ManeuverReport {
        info!("initial orientation scan");
        self.drive.stop();
        self.scanner.recenter(&mut self.clock, &self.config.scan);
        let report = self.sweep_and_turn(ManeuverKind::Orient, self.config.maneuver.stop_pause);
        self.clock.delay(self.config.maneuver.startup_pause);
        info!("starting navigation");
        self.finish_maneuver();
        report
    }

    /// Orient, then step forever at the tick period
    pub fn run(&mut self) -> ! {
        self.start();
        loop {
            self.step();
            self.clock.delay(self.config.tick_period);
        }
    }

    /// One control tick
    pub fn step(&mut self) -> Tick {
        let now = self.clock.now();
        let sample = match self.next_sample_at {
            Some(at) if now < at => None,
            _ => Some(self.sample(now)),
        };

        let cause = sample
            .and_then(|s| self.detector.observe(s))
            .or_else(|| self.detector.check_stall(now));

        if let Some(cause) = cause {
            self.state = NavigationState::Escaping;
            let status = self.report_status(sample.is_some());
            let report = self.escape(cause);
            return Tick {
                state: NavigationState::Escaping,
                sample,
                status,
                maneuver: Some(report),
            };
        }

        let state = self.classify(self.distance);
        if state != self.state {
            debug!("{:?} -> {:?}", self.state, state);
        }
        self.state = state;
        if sample.is_some() {
            match state {
                NavigationState::Cruising => {
                    self.ramp.accelerate();
                }
                NavigationState::Caution => {
                    self.ramp.decelerate();
                }
                NavigationState::Blocked | NavigationState::Escaping => {}
            }
        }
        let status = self.report_status(sample.is_some());

        if state == NavigationState::Blocked {
            let report = self.avoid();
            return Tick {
                state,
                sample,
                status,
                maneuver: Some(report),
            };
        }

        self.drive.forward(self.ramp.speed());
        self.detector.start_moving(now);
        Tick {
            state,
            sample,
            status,
            maneuver: None,
        }
    }

    fn sample(&mut self, now: Instant) -> DistanceSample {
        let sample = DistanceSample::new(self.sensor.measure(), now);
        self.distance = sample.value_cm;
        self.next_sample_at = Some(now + self.config.sample_period);
        sample
    }

    fn classify(&self, distance: u16) -> NavigationState {
        let t = &self.config.thresholds;
        if distance > t.safe_cm {
            NavigationState::Cruising
        } else if distance > t.critical_cm {
            NavigationState::Caution
        } else {
            NavigationState::Blocked
        }
    }

    /// Log the status line on sampled ticks
    fn report_status(&self, sampled: bool) -> Option<NavigationStatus> {
        if !sampled {
            return None;
        }
        let s = self.status();
        info!(
            "dist {} cm | speed {} | {:?} | near hits {} | no change {} | changes {}",
            s.distance_cm,
            s.speed,
            s.state,
            s.near_hits,
            s.no_change_cycles,
            s.changes
        );
        Some(s)
    }

    /// Stop, back off for `reverse`, settle
    fn back_off(&mut self, reverse: Duration) {
        let timing = self.config.maneuver;
        self.drive.stop();
        self.clock.delay(timing.stop_pause);
        info!("reversing for {} ms", reverse.as_millis());
        self.drive.reverse(self.config.speed.max);
        self.clock.delay(reverse);
        self.drive.stop();
        self.clock.delay(timing.settle_pause);
    }

    fn avoid(&mut self) -> ManeuverReport {
        self.state = NavigationState::Blocked;
        info!("obstacle at {} cm", self.distance);
        self.ramp.reset();
        self.detector.stop_moving();
        self.back_off(self.config.maneuver.avoid_reverse);

        let report = self.sweep_and_turn(ManeuverKind::Avoid, self.config.maneuver.stop_pause);
        let open = report
            .scan
            .distance_at(report.best_angle)
            .is_some_and(|d| d > self.config.thresholds.critical_cm);
        if open {
            self.detector.clear_near_hits();
        } else {
            warn!("no open bearing, near hits kept at {}", self.detector.counters().near_hits);
        }
        self.finish_maneuver();
        report
    }

    fn escape(&mut self, cause: EscapeCause) -> ManeuverReport {
        self.state = NavigationState::Escaping;
        warn!("stuck ({:?}), escaping", cause);
        let timing = self.config.maneuver;
        let reverse = match cause {
            EscapeCause::Stall => timing.stall_reverse,
            _ => timing.escape_reverse,
        };
        self.back_off(reverse);

        let report = self.sweep_and_turn(ManeuverKind::Escape(cause), timing.settle_pause);
        self.ramp.reset();
        self.detector.reset(self.clock.now());
        self.finish_maneuver();
        report
    }

    /// Sweep, pick a bearing, turn toward it and stop
    fn sweep_and_turn(&mut self, kind: ManeuverKind, pause: Duration) -> ManeuverReport {
        let scan = self
            .scanner
            .sweep(&mut self.sensor, &mut self.clock, &self.config.scan);
        let best_angle = choose_best_angle(&scan, self.scanner.center());
        let heading = self.heading_for(&scan, best_angle, kind);
        info!("best bearing {}°, {:?}", best_angle, heading);

        match heading {
            Heading::Straight => {}
            Heading::Left(duration) => {
                self.drive.turn_left(self.config.speed.turn);
                self.clock.delay(duration);
                self.drive.stop();
                self.clock.delay(pause);
            }
            Heading::Right(duration) => {
                self.drive.turn_right(self.config.speed.turn);
                self.clock.delay(duration);
                self.drive.stop();
                self.clock.delay(pause);
            }
        }

        ManeuverReport {
            kind,
            scan,
            best_angle,
            heading,
        }
    }

    fn heading_for(&self, scan: &ScanResult, best_angle: u8, kind: ManeuverKind) -> Heading {
        let center = self.scanner.center();
        let timing = &self.config.maneuver;
        match timing.turn_duration(best_angle.abs_diff(center)) {
            Some(duration) if best_angle < center => Heading::Right(duration),
            Some(duration) => Heading::Left(duration),
            None => match kind {
                ManeuverKind::Escape(cause) if cause.turns_around() => {
                    let right = scan.farthest_on_side(center, true).unwrap_or(0);
                    let left = scan.farthest_on_side(center, false).unwrap_or(0);
                    if right >= left {
                        Heading::Right(timing.turn_around)
                    } else {
                        Heading::Left(timing.turn_around)
                    }
                }
                _ => Heading::Straight,
            },
        }
    }

    /// Resume cruising; the next tick samples afresh
    fn finish_maneuver(&mut self) {
        self.state = NavigationState::Cruising;
        self.next_sample_at = None;
    }
}
