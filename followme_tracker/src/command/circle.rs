//! Panoramic circle maneuver.
//!
//! Holds a constant lateral + yaw velocity for a fixed duration while video
//! is recorded, then stops. Blocking: the caller's control loop is suspended
//! for the whole maneuver, but the shutdown flag is checked every tick.

use crate::platform::{FlightPlatform, VelocityCommand};
use followme_common::config::CircleConfig;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ManeuverReport {
    /// Velocity commands sent.
    pub ticks: u32,
    /// True when the shutdown flag cut the maneuver short.
    pub aborted: bool,
    pub recording: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CircleManeuver {
    command: VelocityCommand,
    duration: Duration,
    tick: Duration,
}

impl CircleManeuver {
    pub fn new(config: &CircleConfig) -> Self {
        Self {
            command: VelocityCommand::new(config.lateral_speed, 0, 0, config.yaw_speed),
            duration: config.duration(),
            tick: config.tick(),
        }
    }

    /// The velocity held during the maneuver.
    #[inline]
    pub const fn command(&self) -> VelocityCommand {
        self.command
    }

    /// Fly the circle. Always ends with a hover command and a stopped recording.
    pub fn execute(&self, platform: &mut dyn FlightPlatform, shutdown: &AtomicBool) -> ManeuverReport {
        info!(
            "Circle maneuver: {} for {:.1} s",
            self.command,
            self.duration.as_secs_f64()
        );

        let recording_started = match platform.start_video() {
            Ok(()) => true,
            Err(e) => {
                warn!("Video capture unavailable, flying without it: {e}");
                false
            }
        };

        let start = Instant::now();
        let mut ticks = 0u32;
        let mut aborted = false;
        while start.elapsed() < self.duration {
            if shutdown.load(Ordering::SeqCst) {
                aborted = true;
                break;
            }
            if recording_started {
                if let Err(e) = platform.grab_frame() {
                    debug!("Frame dropped during circle: {e}");
                }
            }
            match platform.send_velocity(self.command) {
                Ok(()) => ticks += 1,
                Err(e) => warn!("Circle command failed: {e}"),
            }
            thread::sleep(self.tick);
        }

        if let Err(e) = platform.send_velocity(VelocityCommand::HOVER) {
            warn!("Hover after circle failed: {e}");
        }

        let recording = if recording_started {
            platform
                .stop_video()
                .map_err(|e| warn!("Stopping video failed: {e}"))
                .ok()
        } else {
            None
        };

        if aborted {
            info!("Circle maneuver aborted after {ticks} ticks");
        } else {
            info!("Circle maneuver complete ({ticks} ticks)");
        }

        ManeuverReport {
            ticks,
            aborted,
            recording,
        }
    }
}
