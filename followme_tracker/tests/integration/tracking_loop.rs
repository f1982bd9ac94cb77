//! Integration test: tracking loop against the simulation driver and the
//! command channel.

use super::support::{Faults, FaultyPlatform, airborne, files_with_prefix, test_config};
use followme_common::channel::CommandWriter;
use followme_common::command::CommandKind;
use followme_common::config::AppConfig;
use followme_tracker::cycle::{TickOutcome, TrackingLoop};
use followme_tracker::detector::BrightRegionDetector;
use followme_tracker::error::TrackerError;
use followme_tracker::platform::PlatformError;
use followme_tracker::platform::simulation::{SimulatedPlatform, TAKEOFF_HEIGHT_CM};
use followme_tracker::state::TrackingState;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tempfile::tempdir;

// ── Helpers ─────────────────────────────────────────────────────────

fn build_loop(config: &AppConfig, platform: FaultyPlatform) -> TrackingLoop {
    TrackingLoop::new(
        config,
        Box::new(platform),
        Box::new(BrightRegionDetector::from_config(&config.detector)),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap()
}

fn commanded(outcome: TickOutcome) -> followme_tracker::command::dispatch::DispatchSummary {
    match outcome {
        TickOutcome::Commanded { dispatched, .. } => dispatched,
        other => panic!("expected a commanded tick, got {other:?}"),
    }
}

// ── Startup ─────────────────────────────────────────────────────────

#[test]
fn start_takes_off_and_climbs() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let faults = Faults::default();
    let platform = FaultyPlatform::new(SimulatedPlatform::new(&config), faults.clone());
    let mut tracking = build_loop(&config, platform);

    tracking.start().unwrap();

    // Ascent command followed by hover.
    assert_eq!(faults.velocity_calls.load(Ordering::SeqCst), 2);
    let altitude = tracking.platform_mut().altitude_cm().unwrap();
    assert!(altitude > TAKEOFF_HEIGHT_CM, "altitude {altitude}");
}

#[test]
fn lost_command_link_during_ascent_still_lands() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let faults = Faults::default();
    faults.fail_velocity.store(true, Ordering::SeqCst);
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut tracking = TrackingLoop::new(
        &config,
        Box::new(FaultyPlatform::new(SimulatedPlatform::new(&config), faults.clone())),
        Box::new(BrightRegionDetector::from_config(&config.detector)),
        shutdown.clone(),
    )
    .unwrap();

    tracking.start().unwrap();
    assert!(!faults.landed.load(Ordering::SeqCst));

    shutdown.store(true, Ordering::SeqCst);
    let exit = tracking.run();
    assert!(exit.landing.is_landed());
    assert!(faults.landed.load(Ordering::SeqCst));
}

#[test]
fn start_fails_when_platform_cannot_connect() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path());
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();
    config.capture.output_dir = blocker.join("captures");

    let platform = FaultyPlatform::new(SimulatedPlatform::new(&config), Faults::default());
    let mut tracking = build_loop(&config, platform);

    let err = tracking.start().unwrap_err();
    assert!(matches!(err, TrackerError::Platform(PlatformError::Capture(_))));
}

// ── Ticks ───────────────────────────────────────────────────────────

#[test]
fn tick_acquires_subject_and_sends_command() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let faults = Faults::default();
    let mut tracking = build_loop(&config, FaultyPlatform::new(airborne(&config), faults.clone()));

    match tracking.tick(Instant::now()) {
        TickOutcome::Commanded { decision, dispatched } => {
            assert_eq!(decision.state, TrackingState::Tracking);
            // Subject starts 30° to the right.
            assert!(decision.command.yaw > 0);
            assert!(dispatched.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(faults.velocity_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn photo_command_is_executed_between_ticks() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let writer = CommandWriter::new(&config.channel);
    let mut tracking = build_loop(&config, FaultyPlatform::new(airborne(&config), Faults::default()));

    writer.publish(CommandKind::TakePhoto).unwrap();
    assert_eq!(commanded(tracking.tick(Instant::now())).photos, 1);
    assert_eq!(commanded(tracking.tick(Instant::now())).photos, 0);
    assert_eq!(files_with_prefix(&config.capture.output_dir, "photo_").len(), 1);
}

#[test]
fn circle_command_records_and_resets_controller() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let writer = CommandWriter::new(&config.channel);
    let mut tracking = build_loop(&config, FaultyPlatform::new(airborne(&config), Faults::default()));

    tracking.tick(Instant::now());
    writer.publish(CommandKind::CircleMotion).unwrap();
    let summary = commanded(tracking.tick(Instant::now()));

    assert_eq!(summary.circles, 1);
    assert_eq!(tracking.controller().lost_frames(), 0);
    assert_eq!(files_with_prefix(&config.capture.output_dir, "video_").len(), 1);
}

#[test]
fn platform_errors_skip_the_whole_tick() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let writer = CommandWriter::new(&config.channel);
    let faults = Faults::default();
    let mut tracking = build_loop(&config, FaultyPlatform::new(airborne(&config), faults.clone()));
    writer.publish(CommandKind::TakePhoto).unwrap();

    faults.fail_frames.store(true, Ordering::SeqCst);
    assert!(matches!(
        tracking.tick(Instant::now()),
        TickOutcome::Skipped(PlatformError::Connection(_))
    ));

    faults.fail_frames.store(false, Ordering::SeqCst);
    faults.fail_altitude.store(true, Ordering::SeqCst);
    assert!(matches!(tracking.tick(Instant::now()), TickOutcome::Skipped(_)));

    // Nothing was sent and the channel was not consumed.
    assert_eq!(faults.velocity_calls.load(Ordering::SeqCst), 0);
    assert_eq!(tracking.stats().skipped, 2);
    assert!(files_with_prefix(&config.capture.output_dir, "photo_").is_empty());

    faults.fail_altitude.store(false, Ordering::SeqCst);
    assert_eq!(commanded(tracking.tick(Instant::now())).photos, 1);
}

#[test]
fn altitude_trip_lands() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let faults = Faults::default();
    let mut platform = airborne(&config);
    platform.world_mut().set_altitude_cm(config.platform.altitude_trip_cm + 50.0);
    let mut tracking = build_loop(&config, FaultyPlatform::new(platform, faults.clone()));

    assert!(matches!(tracking.tick(Instant::now()), TickOutcome::Landing));
    assert_eq!(tracking.controller().state(), TrackingState::Landing);
    assert_eq!(faults.velocity_calls.load(Ordering::SeqCst), 0);

    let exit = tracking.run();
    assert!(exit.landing.is_landed());
    assert!(faults.landed.load(Ordering::SeqCst));
}
