//! Ultrasonic Sensor Sweep
//!
//! Points the range sensor across a set of angles on its servo mount, records
//! one averaged reading per angle and returns the mount to center. The bearing
//! with the most room is then picked from the result.
//!
//! Angles follow the servo: 0° is hard right, 90° straight ahead, 180° hard left.

use heapless::Vec;

use crate::system::clock::Clock;
use crate::system::config::ScanConfig;
use crate::task::range_sensor::RangeSensor;

/// Most angles a single sweep can hold
pub const MAX_SCAN_POINTS: usize = 9;

/// Highest angle the mount accepts
pub const MAX_ANGLE: u8 = 180;

/// Servo that rotates the range sensor
pub trait SensorMount {
    /// Command an absolute angle in degrees, already within `0..=180`
    fn point(&mut self, angle: u8);
}

impl<M: SensorMount + ?Sized> SensorMount for &mut M {
    fn point(&mut self, angle: u8) {
        (**self).point(angle)
    }
}

/// Clamp a requested angle into what the mount accepts
pub fn clamp_angle(requested: i16) -> u8 {
    let clamped = requested.clamp(0, i16::from(MAX_ANGLE));
    if clamped != requested {
        warn!("scan angle {} clamped to {}", requested, clamped);
    }
    clamped as u8
}

/// Distances per angle, in sweep order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanResult {
    readings: Vec<(u8, u16), MAX_SCAN_POINTS>,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading. A repeated angle overwrites its earlier reading in
    /// place. Returns `false` when the result is full.
    pub fn record(&mut self, angle: u8, distance_cm: u16) -> bool {
        if let Some(entry) = self.readings.iter_mut().find(|(a, _)| *a == angle) {
            entry.1 = distance_cm;
            return true;
        }
        self.readings.push((angle, distance_cm)).is_ok()
    }

    pub fn distance_at(&self, angle: u8) -> Option<u16> {
        self.readings
            .iter()
            .find(|(a, _)| *a == angle)
            .map(|&(_, d)| d)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u16)> + '_ {
        self.readings.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Farthest reading among angles below (`right`) or above center
    pub fn farthest_on_side(&self, center: u8, right: bool) -> Option<u16> {
        self.iter()
            .filter(|&(a, _)| if right { a < center } else { a > center })
            .map(|(_, d)| d)
            .max()
    }
}

impl<const N: usize> From<[(u8, u16); N]> for ScanResult {
    fn from(readings: [(u8, u16); N]) -> Self {
        let mut result = ScanResult::new();
        for (angle, distance) in readings {
            result.record(angle, distance);
        }
        result
    }
}

/// Pick the bearing with the largest distance.
///
/// Ties go to the angle closest to `center`; if two tied angles are equally
/// far from center the one swept first wins. An empty result yields `center`.
pub fn choose_best_angle(result: &ScanResult, center: u8) -> u8 {
    let mut readings = result.iter();
    let Some(mut best) = readings.next() else {
        return center;
    };
    for (angle, distance) in readings {
        let farther = distance > best.1;
        let closer_to_center =
            distance == best.1 && angle.abs_diff(center) < best.0.abs_diff(center);
        if farther || closer_to_center {
            best = (angle, distance);
        }
    }
    best.0
}

/// Sweeps the sensor mount and measures each bearing
pub struct DirectionalScanner<M> {
    mount: M,
    center: u8,
}

impl<M: SensorMount> DirectionalScanner<M> {
    pub fn new(mount: M, center: i16) -> Self {
        Self {
            mount,
            center: clamp_angle(center),
        }
    }

    pub fn center(&self) -> u8 {
        self.center
    }

    pub fn mount(&self) -> &M {
        &self.mount
    }

    /// Face forward and wait for the servo
    pub fn recenter<C: Clock>(&mut self, clock: &mut C, config: &ScanConfig) {
        self.mount.point(self.center);
        clock.delay(config.return_settle);
    }

    /// Measure every configured angle in order, then return to center
    pub fn sweep<S, C>(&mut self, sensor: &mut S, clock: &mut C, config: &ScanConfig) -> ScanResult
    where
        S: RangeSensor,
        C: Clock,
    {
        info!("scanning {} bearings", config.angles.len());
        let mut result = ScanResult::new();
        for &requested in config.angles {
            let angle = clamp_angle(requested);
            self.mount.point(angle);
            clock.delay(config.settle);
            let distance = sensor.measure_precise(clock, config.precise_samples, config.precise_pause);
            info!("  {}°: {} cm", angle, distance);
            if !result.record(angle, distance) {
                warn!("scan result full, dropping {}°", angle);
            }
        }
        self.recenter(clock, config);
        result
    }
}
