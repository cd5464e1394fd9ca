//! Stuck detection
//!
//! Watches the stream of forward distance samples for signs that the robot is
//! not getting anywhere. Each sample is classified as a change (differs from the
//! previous one by more than the noise threshold) or a no-change.
//!
//! # Policies
//! - **Immediate bump**: reading at or below the bump threshold
//! - **Near hits**: too many readings inside the critical band; the count decays
//!   while the reading sits between clear and safe and resets beyond safe
//! - **Blockage**: moving, yet too many no-change cycles and the last change is
//!   too old (something the sensor cannot see, e.g. an overhang)
//! - **Stall**: moving for a whole stall window with too few changes (wheel slip)
//!
//! The first three are evaluated per sample, the stall window on every tick.
//!
//! The previous reading starts at the 400cm sentinel and survives [`reset`], so
//! the first sample after an escape is compared against the last one seen
//! before it.
//!
//! [`reset`]: StuckDetector::reset

use embassy_time::Instant;

use crate::system::config::{DistanceThresholds, StuckConfig};
use crate::system::state::{DistanceSample, EscapeCause, StuckCounters, MAX_DISTANCE_CM};

pub struct StuckDetector {
    config: StuckConfig,
    thresholds: DistanceThresholds,
    counters: StuckCounters,
    previous: u16,
}

impl StuckDetector {
    pub fn new(config: StuckConfig, thresholds: DistanceThresholds, now: Instant) -> Self {
        Self {
            config,
            thresholds,
            counters: StuckCounters::new(now),
            previous: MAX_DISTANCE_CM,
        }
    }

    pub fn counters(&self) -> &StuckCounters {
        &self.counters
    }

    pub fn is_moving(&self) -> bool {
        self.counters.moving_since.is_some()
    }

    /// Open a stall window if the robot was not already moving
    pub fn start_moving(&mut self, now: Instant) {
        if self.counters.moving_since.is_none() {
            self.counters.moving_since = Some(now);
            self.counters.changes = 0;
        }
    }

    pub fn stop_moving(&mut self) {
        self.counters.moving_since = None;
    }

    /// An avoidance found an open bearing
    pub fn clear_near_hits(&mut self) {
        self.counters.near_hits = 0;
    }

    /// Clear all counters after an escape; the last reading is kept
    pub fn reset(&mut self, now: Instant) {
        self.counters = StuckCounters::new(now);
    }

    /// Classify a sample and run the per-sample policies
    pub fn observe(&mut self, sample: DistanceSample) -> Option<EscapeCause> {
        let distance = sample.value_cm;
        let changed = self.previous.abs_diff(distance) > self.config.noise_cm;
        self.previous = distance;

        let c = &mut self.counters;
        if changed {
            c.changes = c.changes.saturating_add(1);
            c.no_change_cycles = 0;
            c.last_change = sample.timestamp;
        } else {
            c.no_change_cycles = c.no_change_cycles.saturating_add(1);
        }

        if distance <= self.thresholds.bump_cm {
            warn!("bump at {} cm", distance);
            return Some(EscapeCause::ImmediateBump);
        }

        if distance <= self.thresholds.critical_cm {
            c.near_hits = c.near_hits.saturating_add(1);
            if c.near_hits > self.config.near_hit_limit {
                warn!("{} near hits in a row", c.near_hits);
                return Some(EscapeCause::NearHits);
            }
        } else if distance > self.thresholds.safe_cm {
            c.near_hits = 0;
        } else if distance > self.thresholds.clear_cm {
            c.near_hits = c.near_hits.saturating_sub(1);
        }

        if c.moving_since.is_some()
            && c.no_change_cycles > self.config.no_change_cycles
            && sample.timestamp.saturating_duration_since(c.last_change) > self.config.no_change_time
        {
            warn!(
                "no change for {} cycles while moving, blocked by something unseen",
                c.no_change_cycles
            );
            return Some(EscapeCause::Blockage);
        }

        None
    }

    /// Close the stall window once it has run its length
    pub fn check_stall(&mut self, now: Instant) -> Option<EscapeCause> {
        let since = self.counters.moving_since?;
        if now.saturating_duration_since(since) <= self.config.stall_window {
            return None;
        }
        if self.counters.changes < self.config.stall_min_changes {
            warn!("only {} changes in the stall window", self.counters.changes);
            return Some(EscapeCause::Stall);
        }
        self.counters.moving_since = Some(now);
        self.counters.changes = 0;
        None
    }
}
