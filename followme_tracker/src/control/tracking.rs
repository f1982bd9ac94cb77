//! Subject-centering controller.
//!
//! Pure decision logic: given the latest observation (if any), the measured
//! altitude and the sample time, produce the next velocity command and
//! advance the [`TrackingState`]. No I/O happens here, which keeps every
//! transition testable with synthetic inputs.
//!
//! ## Per-tick rules
//!
//! | State | Subject visible | Subject absent |
//! |-------|-----------------|----------------|
//! | Searching | → Tracking | hover, then rotate after `lost_frame_threshold` ticks |
//! | Tracking | steer | hover; → Recovering once absent `threshold + 1` ticks |
//! | Recovering | → Tracking, PIDs reset | rotate toward last direction |
//! | Landing | hover | hover |
//!
//! Altitude is checked first: above the trip limit the state becomes
//! Landing, above the ceiling the vertical command is replaced by the
//! configured descent speed.

use super::pid::{Pid, PidError};
use crate::detector::SubjectObservation;
use crate::platform::{VelocityCommand, clamp_speed, speed_from_f64};
use crate::safety::altitude::{AltitudeGuard, AltitudeStatus};
use crate::state::{LandingReason, TrackingState};
use followme_common::config::{PlatformConfig, TrackingConfig};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of one controller tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickDecision {
    pub command: VelocityCommand,
    pub state: TrackingState,
    pub altitude: AltitudeStatus,
}

pub struct TrackingController {
    yaw_pid: Pid,
    vertical_pid: Pid,
    guard: AltitudeGuard,
    target_x: f64,
    target_y: f64,
    min_area: f64,
    max_area: f64,
    forward_speed: i32,
    backward_speed: i32,
    vertical_speed_scale: f64,
    vertical_speed_limit: i32,
    search_rotation_speed: i32,
    lost_frame_threshold: u32,
    lost_frames: u32,
    /// Sign of the last nonzero horizontal error (+1 right, -1 left).
    last_direction: i32,
    state: TrackingState,
}

impl TrackingController {
    pub fn new(
        tracking: &TrackingConfig,
        platform: &PlatformConfig,
    ) -> Result<Self, PidError> {
        Ok(Self {
            yaw_pid: Pid::from_config(&tracking.yaw_pid, f64::from(tracking.yaw_speed_limit))?,
            // Raw vertical PID output is scaled afterwards; the limit applies post-scale.
            vertical_pid: Pid::from_config(&tracking.vertical_pid, f64::MAX)?,
            guard: AltitudeGuard::from_config(platform),
            target_x: f64::from(platform.frame_width) * tracking.target_x_fraction,
            target_y: f64::from(platform.frame_height) * tracking.target_y_fraction,
            min_area: f64::from(tracking.min_area),
            max_area: f64::from(tracking.max_area),
            forward_speed: tracking.forward_speed,
            backward_speed: tracking.backward_speed,
            vertical_speed_scale: tracking.vertical_speed_scale,
            vertical_speed_limit: tracking.vertical_speed_limit,
            search_rotation_speed: tracking.search_rotation_speed.abs(),
            lost_frame_threshold: tracking.lost_frame_threshold,
            lost_frames: 0,
            last_direction: 1,
            state: TrackingState::Searching,
        })
    }

    #[inline]
    pub const fn state(&self) -> TrackingState {
        self.state
    }

    /// Consecutive ticks without an observation.
    #[inline]
    pub const fn lost_frames(&self) -> u32 {
        self.lost_frames
    }

    #[inline]
    pub const fn last_direction(&self) -> i32 {
        self.last_direction
    }

    /// Pixel position the subject is steered toward.
    #[inline]
    pub const fn target(&self) -> (f64, f64) {
        (self.target_x, self.target_y)
    }

    /// Compute the command for one tick.
    pub fn tick(
        &mut self,
        observation: Option<SubjectObservation>,
        altitude_cm: f64,
        now: Instant,
    ) -> TickDecision {
        let altitude = self.guard.check(altitude_cm);

        if self.state.is_terminal() {
            return self.decision(VelocityCommand::HOVER, altitude);
        }

        if altitude == AltitudeStatus::Trip {
            warn!("Altitude {altitude_cm:.0} cm above trip limit");
            self.begin_landing(LandingReason::AltitudeTrip);
            return self.decision(VelocityCommand::HOVER, altitude);
        }

        let mut command = match observation {
            Some(obs) => self.on_visible(obs, now),
            None => self.on_absent(),
        };

        if altitude == AltitudeStatus::AboveCeiling {
            debug!(
                "Altitude {altitude_cm:.0} cm above ceiling {:.0} cm, descending",
                self.guard.ceiling_cm()
            );
            command.vertical = clamp_speed(self.guard.descend_speed());
        }

        self.decision(command, altitude)
    }

    /// Enter the terminal Landing state.
    pub fn begin_landing(&mut self, reason: LandingReason) {
        if self.state != TrackingState::Landing {
            info!("{} → {} ({reason})", self.state, TrackingState::Landing);
            self.state = TrackingState::Landing;
        }
    }

    /// Forget controller history after an interruption (e.g. a maneuver).
    ///
    /// The state is kept; the lost counter restarts.
    pub fn reset(&mut self) {
        self.yaw_pid.reset();
        self.vertical_pid.reset();
        self.lost_frames = 0;
    }

    fn decision(&self, command: VelocityCommand, altitude: AltitudeStatus) -> TickDecision {
        TickDecision {
            command,
            state: self.state,
            altitude,
        }
    }

    fn transition(&mut self, next: TrackingState) {
        if self.state != next {
            info!("{} → {next}", self.state);
            self.state = next;
        }
    }

    fn on_visible(&mut self, obs: SubjectObservation, now: Instant) -> VelocityCommand {
        if self.state == TrackingState::Recovering {
            self.yaw_pid.reset();
            self.vertical_pid.reset();
        }
        self.transition(TrackingState::Tracking);
        self.lost_frames = 0;

        let error_x = obs.center_x - self.target_x;
        if error_x > 0.0 {
            self.last_direction = 1;
        } else if error_x < 0.0 {
            self.last_direction = -1;
        }
        let yaw = speed_from_f64(self.yaw_pid.update_at(error_x, now));

        // Image y grows downward: subject below target → descend.
        let error_y = obs.center_y - self.target_y;
        let raw = self.vertical_pid.update_at(error_y, now);
        let limit = f64::from(self.vertical_speed_limit);
        let vertical = speed_from_f64((-raw * self.vertical_speed_scale).clamp(-limit, limit));

        let forward = if obs.area < self.min_area {
            self.forward_speed
        } else if obs.area > self.max_area {
            self.backward_speed
        } else {
            0
        };

        VelocityCommand::new(0, forward, vertical, yaw)
    }

    fn on_absent(&mut self) -> VelocityCommand {
        self.lost_frames = self.lost_frames.saturating_add(1);
        let exceeded = self.lost_frames > self.lost_frame_threshold;

        match self.state {
            TrackingState::Tracking if exceeded => {
                self.transition(TrackingState::Recovering);
                self.search_rotation(self.last_direction)
            }
            TrackingState::Recovering => self.search_rotation(self.last_direction),
            // Nothing seen yet: sweep clockwise.
            TrackingState::Searching if exceeded => self.search_rotation(1),
            _ => VelocityCommand::HOVER,
        }
    }

    fn search_rotation(&self, direction: i32) -> VelocityCommand {
        VelocityCommand::new(0, 0, 0, direction * self.search_rotation_speed)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
