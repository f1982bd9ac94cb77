//! Control accuracy against the simulated world.
//!
//! Runs controller, detector and world model in simulated time (no sleeps)
//! and checks the subject ends up centred at following distance.

use followme_common::config::{AppConfig, TrackingConfig};
use followme_tracker::control::tracking::TrackingController;
use followme_tracker::detector::{BrightRegionDetector, SubjectDetector};
use followme_tracker::platform::simulation::SimWorld;
use followme_tracker::state::TrackingState;
use std::time::{Duration, Instant};

const DT: f64 = 0.1;

/// Quarter-resolution camera keeps the test fast; the area band is scaled
/// accordingly.
fn small_camera_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.platform.frame_width = 480;
    config.platform.frame_height = 360;
    config.tracking = TrackingConfig {
        min_area: 3_500,
        max_area: 3_750,
        ..TrackingConfig::default()
    };
    config.detector.min_area = 25;
    config
}

struct Harness {
    world: SimWorld,
    detector: BrightRegionDetector,
    controller: TrackingController,
    t0: Instant,
    tick: u32,
}

impl Harness {
    fn new(config: &AppConfig, altitude_cm: f64) -> Self {
        let mut world = SimWorld::new(
            &config.simulation,
            config.platform.frame_width,
            config.platform.frame_height,
        );
        world.take_off();
        world.set_altitude_cm(altitude_cm);
        Self {
            world,
            detector: BrightRegionDetector::from_config(&config.detector),
            controller: TrackingController::new(&config.tracking, &config.platform).unwrap(),
            t0: Instant::now(),
            tick: 0,
        }
    }

    fn step(&mut self) {
        self.tick += 1;
        let now = self.t0 + Duration::from_secs_f64(DT * f64::from(self.tick));
        let frame = self.world.render();
        let observation = self.detector.detect(&frame);
        let decision = self
            .controller
            .tick(observation, self.world.altitude_cm(), now);
        self.world.step(decision.command, DT);
    }
}

#[test]
fn converges_on_offset_subject() {
    let config = small_camera_config();
    let mut h = Harness::new(&config, 150.0);
    let initial_distance = h.world.distance_cm();

    for _ in 0..400 {
        h.step();
    }

    assert_eq!(h.controller.state(), TrackingState::Tracking);
    assert!(
        h.world.relative_bearing_deg().abs() < 5.0,
        "bearing {}",
        h.world.relative_bearing_deg()
    );
    assert!(h.world.distance_cm() < initial_distance - 30.0);

    let frame = h.world.render();
    let obs = h.detector.detect(&frame).unwrap();
    let (tx, ty) = h.controller.target();
    assert!((obs.center_x - tx).abs() < 25.0, "x {}", obs.center_x);
    assert!((obs.center_y - ty).abs() < 40.0, "y {}", obs.center_y);
}

#[test]
fn finds_subject_behind_by_searching() {
    let mut config = small_camera_config();
    config.simulation.subject_bearing_deg = 150.0;
    let mut h = Harness::new(&config, 150.0);
    assert!(h.world.subject_box().is_none());

    for _ in 0..120 {
        h.step();
        if h.controller.state() == TrackingState::Tracking {
            break;
        }
    }
    assert_eq!(h.controller.state(), TrackingState::Tracking);
}

#[test]
fn never_climbs_through_the_ceiling() {
    let mut config = small_camera_config();
    // Subject high up: following it would need ~290 cm altitude.
    config.simulation.subject_height_cm = 320.0;
    config.simulation.subject_distance_cm = 300.0;
    let mut h = Harness::new(&config, 215.0);

    let mut max_altitude: f64 = 0.0;
    for _ in 0..300 {
        h.step();
        max_altitude = max_altitude.max(h.world.altitude_cm());
    }
    let ceiling = config.platform.altitude_ceiling_cm;
    assert!(max_altitude > ceiling, "never reached the ceiling: {max_altitude}");
    // One tick of climb at the vertical limit may overshoot before the override.
    assert!(max_altitude <= ceiling + 4.0 + 1e-9, "max altitude {max_altitude}");
    assert_ne!(h.controller.state(), TrackingState::Landing);
}
