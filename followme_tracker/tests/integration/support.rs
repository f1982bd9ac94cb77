//! Shared fixtures: configs rooted in a temp dir and a fault-injecting
//! platform wrapper.

use followme_common::config::{AppConfig, ChannelConfig};
use followme_tracker::platform::simulation::SimulatedPlatform;
use followme_tracker::platform::{FlightPlatform, Frame, PlatformError, VelocityCommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

/// Fast config with channel and captures under `dir`.
pub fn test_config(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.channel = ChannelConfig {
        path: dir.join("commands.json"),
        retain: 64,
    };
    config.capture.output_dir = dir.join("captures");
    config.tracking.loop_interval_ms = 20;
    config.platform.takeoff_ascent_duration_s = 0.05;
    config.platform.land_timeout_ms = 500;
    config.circle.duration_s = 0.05;
    config.circle.tick_ms = 10;
    config
}

/// Connected, airborne simulation platform.
pub fn airborne(config: &AppConfig) -> SimulatedPlatform {
    let mut platform = SimulatedPlatform::new(config);
    platform.connect().unwrap();
    platform.takeoff().unwrap();
    platform
}

pub fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with(prefix))
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Switches shared between a test and its [`FaultyPlatform`].
#[derive(Clone, Default)]
pub struct Faults {
    pub fail_frames: Arc<AtomicBool>,
    pub fail_altitude: Arc<AtomicBool>,
    pub fail_velocity: Arc<AtomicBool>,
    /// `land()` blocks this long [ms].
    pub land_delay_ms: Arc<AtomicU32>,
    pub velocity_calls: Arc<AtomicU32>,
    pub landed: Arc<AtomicBool>,
}

/// Simulation platform with injectable failures.
pub struct FaultyPlatform {
    inner: SimulatedPlatform,
    faults: Faults,
}

impl FaultyPlatform {
    pub fn new(inner: SimulatedPlatform, faults: Faults) -> Self {
        Self { inner, faults }
    }
}

impl FlightPlatform for FaultyPlatform {
    fn name(&self) -> &'static str {
        "faulty"
    }

    fn connect(&mut self) -> Result<(), PlatformError> {
        self.inner.connect()
    }

    fn takeoff(&mut self) -> Result<(), PlatformError> {
        self.inner.takeoff()
    }

    fn land(&mut self) -> Result<(), PlatformError> {
        let delay = self.faults.land_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(u64::from(delay)));
        }
        self.inner.land()?;
        self.faults.landed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn send_velocity(&mut self, command: VelocityCommand) -> Result<(), PlatformError> {
        self.faults.velocity_calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_velocity.load(Ordering::SeqCst) {
            return Err(PlatformError::Connection("command link dropped".into()));
        }
        self.inner.send_velocity(command)
    }

    fn altitude_cm(&mut self) -> Result<f64, PlatformError> {
        if self.faults.fail_altitude.load(Ordering::SeqCst) {
            return Err(PlatformError::Connection("telemetry timeout".into()));
        }
        self.inner.altitude_cm()
    }

    fn grab_frame(&mut self) -> Result<Frame, PlatformError> {
        if self.faults.fail_frames.load(Ordering::SeqCst) {
            return Err(PlatformError::Connection("video stream stalled".into()));
        }
        self.inner.grab_frame()
    }

    fn capture_photo(&mut self) -> Result<PathBuf, PlatformError> {
        self.inner.capture_photo()
    }

    fn start_video(&mut self) -> Result<(), PlatformError> {
        self.inner.start_video()
    }

    fn stop_video(&mut self) -> Result<PathBuf, PlatformError> {
        self.inner.stop_video()
    }

    fn shutdown(&mut self) -> Result<(), PlatformError> {
        self.inner.shutdown()
    }
}
