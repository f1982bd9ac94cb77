//! Integration test: tracking state transitions and command overrides.
//!
//! Validates:
//! 1. Tracking → Recovering exactly after `threshold + 1` absent ticks
//! 2. Ceiling override of the vertical command in every state
//! 3. PID history cleared on re-acquisition from Recovering

use followme_common::config::{PlatformConfig, TrackingConfig};
use followme_tracker::control::tracking::TrackingController;
use followme_tracker::detector::SubjectObservation;
use followme_tracker::platform::VelocityCommand;
use followme_tracker::safety::altitude::AltitudeStatus;
use followme_tracker::state::{LandingReason, TrackingState};
use std::time::{Duration, Instant};

// ── Helpers ─────────────────────────────────────────────────────────

const SAFE_ALTITUDE: f64 = 120.0;

fn controller_with_threshold(threshold: u32) -> TrackingController {
    let tracking = TrackingConfig {
        lost_frame_threshold: threshold,
        ..TrackingConfig::default()
    };
    TrackingController::new(&tracking, &PlatformConfig::default()).unwrap()
}

fn offset_subject() -> SubjectObservation {
    // 200 px right of and 200 px below the default target (480, 180).
    SubjectObservation::new(680.0, 380.0, 14_500.0)
}

struct Clock {
    t0: Instant,
    tick: u64,
}

impl Clock {
    fn new() -> Self {
        Self {
            t0: Instant::now(),
            tick: 0,
        }
    }

    fn next(&mut self) -> Instant {
        self.tick += 1;
        self.t0 + Duration::from_millis(100 * self.tick)
    }
}

// ── Lost-subject threshold ──────────────────────────────────────────

#[test]
fn recovering_entered_on_threshold_plus_one_absent_ticks() {
    for threshold in [0u32, 1, 5, 15] {
        let mut c = controller_with_threshold(threshold);
        let mut clock = Clock::new();
        c.tick(Some(offset_subject()), SAFE_ALTITUDE, clock.next());
        assert_eq!(c.state(), TrackingState::Tracking);

        for absent in 1..=threshold {
            let d = c.tick(None, SAFE_ALTITUDE, clock.next());
            assert_eq!(
                d.state,
                TrackingState::Tracking,
                "threshold {threshold}, absent {absent}"
            );
            assert!(d.command.is_hover());
        }

        let d = c.tick(None, SAFE_ALTITUDE, clock.next());
        assert_eq!(d.state, TrackingState::Recovering, "threshold {threshold}");
        assert_eq!(d.command, VelocityCommand::new(0, 0, 0, 40));
    }
}

#[test]
fn brief_dropout_does_not_trigger_recovery() {
    let mut c = controller_with_threshold(3);
    let mut clock = Clock::new();
    for _ in 0..10 {
        c.tick(Some(offset_subject()), SAFE_ALTITUDE, clock.next());
        for _ in 0..3 {
            c.tick(None, SAFE_ALTITUDE, clock.next());
        }
    }
    assert_eq!(c.state(), TrackingState::Tracking);
}

// ── Altitude ────────────────────────────────────────────────────────

#[test]
fn ceiling_overrides_vertical_in_every_active_state() {
    let platform = PlatformConfig::default();
    let above = platform.altitude_ceiling_cm + 5.0;
    let mut c = controller_with_threshold(1);
    let mut clock = Clock::new();

    // Searching
    let d = c.tick(None, above, clock.next());
    assert_eq!((d.state, d.command.vertical), (TrackingState::Searching, -10));

    // Tracking: the PID would ask to descend at 20; the override wins.
    let d = c.tick(Some(offset_subject()), above, clock.next());
    assert_eq!(d.state, TrackingState::Tracking);
    assert_eq!(d.command.vertical, platform.descend_speed);
    assert_eq!(d.altitude, AltitudeStatus::AboveCeiling);
    // Other axes are untouched.
    assert_eq!(d.command.yaw, 40);

    // Recovering
    c.tick(None, above, clock.next());
    let d = c.tick(None, above, clock.next());
    assert_eq!(d.state, TrackingState::Recovering);
    assert_eq!(d.command.vertical, -10);
    assert_eq!(d.command.yaw, 40);
}

#[test]
fn at_ceiling_is_not_above_it() {
    let mut c = controller_with_threshold(15);
    let d = c.tick(Some(offset_subject()), 220.0, Instant::now());
    assert_eq!(d.altitude, AltitudeStatus::Nominal);
    assert_eq!(d.command.vertical, -20);
}

#[test]
fn shutdown_landing_is_terminal() {
    let mut c = controller_with_threshold(15);
    let mut clock = Clock::new();
    c.tick(Some(offset_subject()), SAFE_ALTITUDE, clock.next());
    c.begin_landing(LandingReason::Shutdown);
    for _ in 0..5 {
        let d = c.tick(Some(offset_subject()), SAFE_ALTITUDE, clock.next());
        assert_eq!(d.state, TrackingState::Landing);
        assert!(d.command.is_hover());
    }
}

// ── Re-acquisition ──────────────────────────────────────────────────

#[test]
fn reacquisition_from_recovering_resets_pid_history() {
    let mut c = controller_with_threshold(2);
    let mut clock = Clock::new();

    // Build up integral: constant 200 px error for 1 s.
    let mut last = VelocityCommand::HOVER;
    for _ in 0..11 {
        last = c.tick(Some(offset_subject()), SAFE_ALTITUDE, clock.next()).command;
    }
    // kp·e + ki·∫e = 40 + 0.04·200 = 48
    assert_eq!(last.yaw, 48);

    for _ in 0..3 {
        c.tick(None, SAFE_ALTITUDE, clock.next());
    }
    assert_eq!(c.state(), TrackingState::Recovering);

    // Fresh controllers: first sample is pure proportional.
    let d = c.tick(Some(offset_subject()), SAFE_ALTITUDE, clock.next());
    assert_eq!(d.state, TrackingState::Tracking);
    assert_eq!(d.command.yaw, 40);
    assert_eq!(d.command.vertical, -20);
}

#[test]
fn short_dropout_keeps_pid_history() {
    let mut c = controller_with_threshold(15);
    let mut clock = Clock::new();
    for _ in 0..11 {
        c.tick(Some(offset_subject()), SAFE_ALTITUDE, clock.next());
    }
    c.tick(None, SAFE_ALTITUDE, clock.next());
    let d = c.tick(Some(offset_subject()), SAFE_ALTITUDE, clock.next());
    // Integral kept and extended over the 200 ms gap: 40 + 0.04·(200 + 40) = 49.6
    assert_eq!(d.command.yaw, 50);
}
