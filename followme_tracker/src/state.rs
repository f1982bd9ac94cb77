//! Tracking state machine states.
//!
//! Searching → Tracking ↔ Recovering, any → Landing. Landing is terminal;
//! transitions are driven by [`crate::control::tracking::TrackingController`].

use std::fmt;

/// Phase of the follow-me control loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TrackingState {
    /// No subject acquired yet since takeoff.
    #[default]
    Searching,
    /// Subject visible, or missing for no more than the lost-frame threshold.
    Tracking,
    /// Subject lost; rotating toward where it was last seen.
    Recovering,
    /// Shutdown or safety trip in progress. Terminal.
    Landing,
}

impl TrackingState {
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Landing)
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Searching => "SEARCHING",
            Self::Tracking => "TRACKING",
            Self::Recovering => "RECOVERING",
            Self::Landing => "LANDING",
        })
    }
}

/// Why the loop entered [`TrackingState::Landing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingReason {
    /// Operator interrupt or termination signal.
    Shutdown,
    /// Altitude exceeded the trip limit.
    AltitudeTrip,
}

impl fmt::Display for LandingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => f.write_str("shutdown requested"),
            Self::AltitudeTrip => f.write_str("altitude trip"),
        }
    }
}
