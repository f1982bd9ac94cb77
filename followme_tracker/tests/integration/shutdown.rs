//! Integration test: shutdown and bounded landing.

use super::support::{Faults, FaultyPlatform, airborne, test_config};
use followme_tracker::cycle::TrackingLoop;
use followme_tracker::detector::BrightRegionDetector;
use followme_tracker::platform::PlatformError;
use followme_tracker::platform::simulation::SimulatedPlatform;
use followme_tracker::safety::landing::{LandingOutcome, land_with_timeout};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

#[test]
fn signal_flag_stops_loop_and_lands() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let faults = Faults::default();
    let shutdown = Arc::new(AtomicBool::new(false));
    let tracking = TrackingLoop::new(
        &config,
        Box::new(FaultyPlatform::new(airborne(&config), faults.clone())),
        Box::new(BrightRegionDetector::from_config(&config.detector)),
        shutdown.clone(),
    )
    .unwrap();

    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        shutdown.store(true, Ordering::SeqCst);
    });
    let exit = tracking.run();
    trigger.join().unwrap();

    assert!(exit.stats.ticks > 0);
    assert!(exit.landing.is_landed());
    assert!(faults.landed.load(Ordering::SeqCst));
}

#[test]
fn hung_landing_is_abandoned_after_timeout() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.platform.land_timeout_ms = 100;
    let faults = Faults::default();
    faults.land_delay_ms.store(3_000, Ordering::SeqCst);

    let tracking = TrackingLoop::new(
        &config,
        Box::new(FaultyPlatform::new(airborne(&config), faults.clone())),
        Box::new(BrightRegionDetector::from_config(&config.detector)),
        Arc::new(AtomicBool::new(true)),
    )
    .unwrap();

    let started = Instant::now();
    let exit = tracking.run();
    assert!(matches!(exit.landing, LandingOutcome::TimedOut));
    assert!(started.elapsed() < Duration::from_millis(1_500));
    assert_eq!(exit.stats.ticks, 0);
    assert!(!faults.landed.load(Ordering::SeqCst));
}

#[test]
fn landing_error_is_reported() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    // Never connected: the driver refuses to land.
    let platform = SimulatedPlatform::new(&config);
    let outcome = land_with_timeout(Box::new(platform), Duration::from_secs(1));
    assert!(matches!(
        outcome,
        LandingOutcome::Failed(PlatformError::Connection(_))
    ));
}
