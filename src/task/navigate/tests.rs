use embassy_time::{Duration, Instant};

use super::*;
use crate::error::ConfigError;
use crate::sim::{self, RecordingActuator, SimulatedMount, SimulatedSonar, VirtualClock};
use crate::system::motion_command::MotionCommand;
use crate::task::range_sensor::{PulseEcho, Sonar};

type SimController = NavigationController<SimulatedSonar, SimulatedMount, RecordingActuator, VirtualClock>;

/// Steps the controller and advances virtual time by one tick period
struct Harness {
    nav: SimController,
    clock: VirtualClock,
}

impl Harness {
    fn new(config: NavigationConfig, setup: impl FnOnce(&mut SimulatedSonar)) -> Self {
        let clock = VirtualClock::new();
        let (mut sonar, mount) = sim::sonar_rig(config.scan.center);
        setup(&mut sonar);
        let drive = RecordingActuator::new(clock.clone());
        let nav = NavigationController::new(config, sonar, mount, drive, clock.clone()).unwrap();
        Self { nav, clock }
    }

    fn tick(&mut self) -> Tick {
        let tick = self.nav.step();
        self.clock.advance(self.nav.config().tick_period);
        tick
    }

    fn run(&mut self, ticks: usize) -> Vec<Tick> {
        (0..ticks).map(|_| self.tick()).collect()
    }

    /// Tick until a maneuver runs; returns when it started and the tick
    fn run_until_maneuver(&mut self, limit: usize) -> (Instant, Tick) {
        for _ in 0..limit {
            let at = self.clock.now();
            let tick = self.tick();
            if tick.maneuver.is_some() {
                return (at, tick);
            }
        }
        panic!("no maneuver within {limit} ticks");
    }

    fn commands(&self) -> Vec<MotionCommand> {
        self.nav.drive().commands().iter().map(|&(_, c)| c).collect()
    }
}

fn alternating(a: u16, b: u16, n: usize) -> Vec<u16> {
    (0..n).map(|i| if i % 2 == 0 { a } else { b }).collect()
}

/// Time between a command and the next recorded command
fn leg_after(nav: &SimController, command: MotionCommand) -> Duration {
    let commands = nav.drive().commands();
    let i = commands.iter().position(|&(_, c)| c == command).unwrap();
    commands[i + 1].0 - commands[i].0
}

#[test]
fn first_tick_cruises_one_step_above_min() {
    let mut h = Harness::new(NavigationConfig::FIVE_POINT, |_| {});
    let tick = h.tick();
    assert_eq!(tick.state, NavigationState::Cruising);
    assert_eq!(tick.sample.map(|s| s.value_cm), Some(MAX_DISTANCE_CM));
    assert_eq!(h.nav.drive().last(), Some(MotionCommand::Forward(105)));
}

#[test]
fn samples_at_the_sample_period_not_every_tick() {
    let mut h = Harness::new(NavigationConfig::FIVE_POINT, |_| {});
    let ticks = h.run(45);
    let sampled: Vec<usize> = ticks
        .iter()
        .enumerate()
        .filter(|(_, t)| t.sample.is_some())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(sampled, vec![0, 15, 30]);
    assert_eq!(h.nav.sensor().reads(), 3);
}

#[test]
fn cruising_ramps_up_to_max_monotonically() {
    let mut h = Harness::new(NavigationConfig::FIVE_POINT, |s| {
        s.push_forward(alternating(300, 320, 60));
    });
    let mut last = 0;
    for _ in 0..400 {
        let tick = h.tick();
        assert_eq!(tick.state, NavigationState::Cruising);
        let speed = h.nav.speed();
        assert!(speed >= last);
        assert!(speed <= 160);
        last = speed;
    }
    assert_eq!(last, 160);
}

#[test]
fn caution_slows_down_without_undershooting_min() {
    let mut config = NavigationConfig::FIVE_POINT;
    config.speed.decel_step = 20;
    let mut h = Harness::new(config, |s| {
        s.push_forward(alternating(300, 320, 10));
        s.push_forward(alternating(22, 18, 6));
    });

    let mut speeds = Vec::new();
    for _ in 0..16 * 15 {
        let tick = h.tick();
        if tick.state == NavigationState::Caution && tick.sample.is_some() {
            speeds.push(h.nav.speed());
        }
        assert!(tick.maneuver.is_none());
    }

    // ten clear samples take the ramp to 150
    assert_eq!(speeds, vec![130, 110, 100, 100, 100, 100]);
    assert!(h
        .commands()
        .iter()
        .all(|c| matches!(c, MotionCommand::Forward(_))));
}

#[test]
fn blocked_backs_off_and_turns_toward_open_bearing() {
    let mut h = Harness::new(NavigationConfig::FIVE_POINT, |s| {
        s.push_forward([50, 48, 46, 5, 5, 5, 5]);
        s.set_view(&[(0, 30), (45, 120), (135, 60), (180, 20)]);
    });

    // three clear samples, then 5 cm on the fourth
    let mut before = 0;
    let mut blocked = None;
    for _ in 0..100 {
        before = h.nav.drive().commands().len();
        let tick = h.tick();
        if tick.maneuver.is_some() {
            blocked = Some(tick);
            break;
        }
    }
    let blocked = blocked.unwrap();
    assert_eq!(blocked.state, NavigationState::Blocked);
    assert_eq!(blocked.sample.map(|s| s.value_cm), Some(5));

    let report = blocked.maneuver.unwrap();
    assert_eq!(report.kind, ManeuverKind::Avoid);
    assert_eq!(report.best_angle, 45);
    assert_eq!(report.heading, Heading::Right(Duration::from_millis(250)));
    assert_eq!(report.scan.distance_at(90), Some(5));

    assert_eq!(
        h.commands()[before..],
        [
            MotionCommand::Stop,
            MotionCommand::Reverse(160),
            MotionCommand::Stop,
            MotionCommand::TurnRight(120),
            MotionCommand::Stop,
        ]
    );
    assert_eq!(leg_after(&h.nav, MotionCommand::Reverse(160)), Duration::from_millis(200));
    assert_eq!(leg_after(&h.nav, MotionCommand::TurnRight(120)), Duration::from_millis(250));
    // an open bearing was found
    assert_eq!(h.nav.counters().near_hits, 0);

    // resumes at min speed with a fresh sample
    let next = h.tick();
    assert!(next.sample.is_some());
    assert_eq!(next.state, NavigationState::Cruising);
    assert_eq!(h.nav.drive().last(), Some(MotionCommand::Forward(105)));

    let rest = h.run(50);
    assert!(rest.iter().all(|t| t.maneuver.is_none()));
    let reverses = h
        .commands()
        .iter()
        .filter(|c| matches!(c, MotionCommand::Reverse(_)))
        .count();
    assert_eq!(reverses, 1);
}

#[test]
fn commanded_speeds_stay_in_profile() {
    let config = NavigationConfig::FIVE_POINT;
    let mut h = Harness::new(config, |s| {
        s.push_forward([50, 48, 46, 5, 5, 5, 5]);
        s.push_forward(alternating(300, 320, 20));
        s.set_view(&[(0, 30), (45, 120), (135, 60), (180, 20)]);
    });
    h.run(400);
    for command in h.commands() {
        if let Some(speed) = command.speed() {
            assert!(
                (config.speed.min..=config.speed.max).contains(&speed),
                "{command:?}"
            );
        }
    }
}

#[test]
fn unchanging_reading_while_moving_escapes_as_blockage() {
    let mut h = Harness::new(NavigationConfig::FIVE_POINT, |s| {
        s.set_fallback(100);
        s.set_view(&[(0, 30), (45, 40), (135, 50), (180, 20)]);
        // wobbles by up to 2 cm, inside the noise threshold
        s.set_jitter(42, 2);
    });

    let (at, tick) = h.run_until_maneuver(300);
    // fourteen unchanged samples after the first, 2.1 s without a change
    assert_eq!(at, Instant::from_millis(2100));
    assert_eq!(tick.state, NavigationState::Escaping);

    let report = tick.maneuver.unwrap();
    assert_eq!(report.kind, ManeuverKind::Escape(EscapeCause::Blockage));
    // forward looks best but cannot be trusted; left side is more open
    assert_eq!(report.best_angle, 90);
    assert_eq!(report.heading, Heading::Left(Duration::from_millis(900)));
    assert_eq!(leg_after(&h.nav, MotionCommand::Reverse(160)), Duration::from_millis(400));

    assert!(h.nav.counters().is_clear());
    assert_eq!(h.nav.state(), NavigationState::Cruising);
    assert!(h.run(100).iter().all(|t| t.maneuver.is_none()));
}

#[test]
fn bump_escapes_immediately() {
    let mut h = Harness::new(NavigationConfig::FIVE_POINT, |s| {
        s.push_forward([80, 2]);
    });
    let (at, tick) = h.run_until_maneuver(30);
    assert_eq!(at, Instant::from_millis(150));
    assert_eq!(
        tick.maneuver.map(|m| m.kind),
        Some(ManeuverKind::Escape(EscapeCause::ImmediateBump))
    );
    assert_eq!(tick.state, NavigationState::Escaping);
}

#[test]
fn failed_avoidances_escalate_to_near_hit_escape() {
    let mut h = Harness::new(NavigationConfig::FIVE_POINT, |s| {
        s.set_fallback(10);
        s.set_view(&[(0, 8), (45, 8), (135, 8), (180, 8)]);
    });

    let kinds: Vec<ManeuverKind> = h
        .run(4)
        .into_iter()
        .map(|t| t.maneuver.unwrap().kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            ManeuverKind::Avoid,
            ManeuverKind::Avoid,
            ManeuverKind::Avoid,
            ManeuverKind::Escape(EscapeCause::NearHits),
        ]
    );
    assert!(h.nav.counters().is_clear());
}

#[test]
fn status_mirrors_counters() {
    let mut h = Harness::new(NavigationConfig::FIVE_POINT, |s| {
        s.set_fallback(10);
        s.set_view(&[(0, 8), (45, 8), (135, 8), (180, 8)]);
    });
    h.run(2);

    let status = h.nav.status();
    let counters = h.nav.counters();
    assert_eq!(status.near_hits, 2);
    assert_eq!(status.near_hits, counters.near_hits);
    assert_eq!(status.no_change_cycles, counters.no_change_cycles);
    assert_eq!(status.changes, counters.changes);
    assert_eq!(status.distance_cm, 10);
    assert_eq!(status.speed, 100);
}

#[test]
fn few_changes_over_stall_window_escapes_as_stall() {
    let mut config = NavigationConfig::FIVE_POINT;
    config.stuck.no_change_cycles = 1000;
    let mut h = Harness::new(config, |_| {});

    let (at, tick) = h.run_until_maneuver(1100);
    assert_eq!(at, Instant::from_millis(10_010));
    // stall is checked on ticks without a sample too
    assert_eq!(tick.sample, None);
    assert_eq!(
        tick.maneuver.map(|m| m.kind),
        Some(ManeuverKind::Escape(EscapeCause::Stall))
    );
    assert_eq!(leg_after(&h.nav, MotionCommand::Reverse(160)), Duration::from_millis(500));
}

#[test]
fn stall_window_rolls_over_while_readings_change() {
    let mut h = Harness::new(NavigationConfig::FIVE_POINT, |s| {
        s.push_forward(alternating(300, 320, 100));
    });
    assert!(h.run(1200).iter().all(|t| t.maneuver.is_none()));
    assert_eq!(h.nav.counters().moving_since, Some(Instant::from_millis(10_010)));
}

#[test]
fn start_orients_toward_open_bearing() {
    let mut h = Harness::new(NavigationConfig::FIVE_POINT, |s| {
        s.set_fallback(70);
        s.set_view(&[(0, 30), (45, 120), (135, 60), (180, 20)]);
    });

    let report = h.nav.start();
    assert_eq!(report.kind, ManeuverKind::Orient);
    assert_eq!(report.heading, Heading::Right(Duration::from_millis(250)));
    assert_eq!(
        h.commands(),
        vec![MotionCommand::Stop, MotionCommand::TurnRight(120), MotionCommand::Stop]
    );
    assert_eq!(h.nav.mount().history(), &[90, 0, 45, 90, 135, 180, 90]);
    // recenter, sweep, turn, stop pause, startup pause
    assert_eq!(h.clock.elapsed(), Duration::from_millis(500 + 4250 + 250 + 200 + 1000));
    assert!(h.tick().sample.is_some());
}

#[test]
fn start_keeps_heading_when_forward_is_best() {
    let mut h = Harness::new(NavigationConfig::FIVE_POINT, |_| {});
    let report = h.nav.start();
    assert_eq!(report.best_angle, 90);
    assert_eq!(report.heading, Heading::Straight);
    assert_eq!(h.commands(), vec![MotionCommand::Stop]);
}

#[test]
fn three_point_preset_uses_its_own_table() {
    let mut h = Harness::new(NavigationConfig::THREE_POINT, |s| {
        s.push_forward([50, 10, 10, 10, 10]);
        s.set_view(&[(0, 60), (180, 20)]);
    });
    let (_, tick) = h.run_until_maneuver(30);
    let report = tick.maneuver.unwrap();
    assert_eq!(report.kind, ManeuverKind::Avoid);
    assert_eq!(report.best_angle, 0);
    assert_eq!(report.heading, Heading::Right(Duration::from_millis(500)));
    assert_eq!(report.scan.len(), 3);
}

struct NoEcho;

impl PulseEcho for NoEcho {
    fn echo(&mut self, _timeout: Duration) -> Option<Duration> {
        None
    }
}

#[test]
fn silent_sensor_reads_as_open_space_and_trips_blockage() {
    // a dead sensor looks like a clear path; the robot drives on until the
    // never-changing reading is taken for an unseen blockage, over and over
    let config = NavigationConfig::FIVE_POINT;
    let clock = VirtualClock::new();
    let (_, mount) = sim::sonar_rig(config.scan.center);
    let mut nav = NavigationController::new(
        config,
        Sonar::new(NoEcho, config.sonar),
        mount,
        RecordingActuator::new(clock.clone()),
        clock.clone(),
    )
    .unwrap();

    let mut escapes = Vec::new();
    for _ in 0..1000 {
        let at = clock.now();
        let tick = nav.step();
        clock.advance(config.tick_period);
        match tick.maneuver {
            Some(report) => escapes.push((at, report.kind, report.heading)),
            None => assert_eq!(tick.state, NavigationState::Cruising),
        }
        assert_eq!(nav.distance(), MAX_DISTANCE_CM);
    }

    assert!(escapes.len() >= 2, "{escapes:?}");
    assert_eq!(escapes[0].0, Instant::from_millis(2100));
    for &(_, kind, heading) in &escapes {
        assert_eq!(kind, ManeuverKind::Escape(EscapeCause::Blockage));
        // every bearing reads 400, so it turns around toward the right
        assert_eq!(heading, Heading::Right(Duration::from_millis(900)));
    }
}

#[test]
fn status_line_reports_the_state_being_acted_on() {
    let mut h = Harness::new(NavigationConfig::FIVE_POINT, |s| {
        s.push_forward([300, 22, 10, 10, 10, 10]);
        s.set_view(&[(0, 30), (45, 120), (135, 60), (180, 20)]);
    });

    let ticks = h.run(31);
    let logged: Vec<(NavigationState, NavigationStatus)> = ticks
        .iter()
        .filter_map(|t| t.status.map(|s| (t.state, s)))
        .collect();
    assert_eq!(logged.len(), 3);
    for (state, status) in &logged {
        assert_eq!(status.state, *state);
    }
    assert_eq!(
        logged.iter().map(|(state, _)| *state).collect::<Vec<_>>(),
        vec![
            NavigationState::Cruising,
            NavigationState::Caution,
            NavigationState::Blocked,
        ]
    );
    // the ramp has already moved for the sample
    assert_eq!(logged[0].1.speed, 105);
    assert_eq!(logged[1].1.speed, 100);
    assert_eq!(logged[1].1.distance_cm, 22);
    assert!(ticks.iter().filter(|t| t.sample.is_none()).all(|t| t.status.is_none()));
}

#[test]
fn rejects_invalid_config() {
    let mut config = NavigationConfig::FIVE_POINT;
    config.speed.min = 200;
    let clock = VirtualClock::new();
    let (sonar, mount) = sim::sonar_rig(90);
    let result = NavigationController::new(
        config,
        sonar,
        mount,
        RecordingActuator::new(clock.clone()),
        clock,
    );
    assert_eq!(
        result.err(),
        Some(Error::InvalidConfig(ConfigError::SpeedRange))
    );
}
