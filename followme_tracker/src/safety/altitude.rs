//! Altitude envelope.
//!
//! Above the ceiling the vertical command is overridden with a fixed
//! descent; above the trip altitude the tracker lands.

use followme_common::config::PlatformConfig;

/// Classification of one altitude reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AltitudeStatus {
    Nominal,
    /// Strictly above the ceiling: force descent.
    AboveCeiling,
    /// Strictly above the trip altitude: land.
    Trip,
}

#[derive(Debug, Clone, Copy)]
pub struct AltitudeGuard {
    ceiling_cm: f64,
    trip_cm: f64,
    descend_speed: i32,
}

impl AltitudeGuard {
    pub const fn new(ceiling_cm: f64, trip_cm: f64, descend_speed: i32) -> Self {
        Self {
            ceiling_cm,
            trip_cm,
            descend_speed,
        }
    }

    pub fn from_config(config: &PlatformConfig) -> Self {
        Self::new(
            config.altitude_ceiling_cm,
            config.altitude_trip_cm,
            config.descend_speed,
        )
    }

    /// A non-finite reading is treated as above the ceiling.
    pub fn check(&self, altitude_cm: f64) -> AltitudeStatus {
        if !altitude_cm.is_finite() {
            return AltitudeStatus::AboveCeiling;
        }
        if altitude_cm > self.trip_cm {
            AltitudeStatus::Trip
        } else if altitude_cm > self.ceiling_cm {
            AltitudeStatus::AboveCeiling
        } else {
            AltitudeStatus::Nominal
        }
    }

    #[inline]
    pub const fn descend_speed(&self) -> i32 {
        self.descend_speed
    }

    #[inline]
    pub const fn ceiling_cm(&self) -> f64 {
        self.ceiling_cm
    }
}
