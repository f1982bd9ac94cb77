//! Snap detection on paired sensor readings.
//!
//! A snap is a reading pair whose magnitudes differ by more than the
//! threshold while both stay inside the valid range. After a detection the
//! detector disarms until the difference falls back to or below the
//! threshold, so one sustained impulse yields one event.

use crate::sensor::SensorReading;
use followme_common::config::GestureConfig;
use std::time::Instant;

/// Which sensor carried the larger magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensor {
    First,
    Second,
}

/// A single detected impulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapEvent {
    pub at: Instant,
    pub leading: Sensor,
    /// `|first - second|`.
    pub difference: u64,
}

impl SnapEvent {
    pub const fn new(at: Instant, leading: Sensor, difference: u64) -> Self {
        Self {
            at,
            leading,
            difference,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapDetector {
    threshold: u64,
    valid_min: i64,
    valid_max: i64,
    armed: bool,
}

impl SnapDetector {
    pub fn new(threshold: u64, valid_min: i64, valid_max: i64) -> Self {
        Self {
            threshold,
            valid_min,
            valid_max,
            armed: true,
        }
    }

    pub fn from_config(config: &GestureConfig) -> Self {
        Self::new(config.snap_threshold.unsigned_abs(), config.valid_min, config.valid_max)
    }

    fn in_range(&self, value: i64) -> bool {
        (self.valid_min..=self.valid_max).contains(&value)
    }

    /// Examine one reading pair taken at `at`.
    pub fn sample(&mut self, reading: SensorReading, at: Instant) -> Option<SnapEvent> {
        if !(self.in_range(reading.first) && self.in_range(reading.second)) {
            return None;
        }

        let difference = reading.first.abs_diff(reading.second);
        if difference <= self.threshold {
            self.armed = true;
            return None;
        }
        if !self.armed {
            return None;
        }

        self.armed = false;
        let leading = if reading.first >= reading.second {
            Sensor::First
        } else {
            Sensor::Second
        };
        Some(SnapEvent::new(at, leading, difference))
    }

    #[inline]
    pub const fn armed(&self) -> bool {
        self.armed
    }
}
