//! Gesture command dispatch.
//!
//! Polled once per control tick. New commands are executed in sequence
//! order:
//! - `TAKE_PHOTO` triggers a still capture and returns immediately.
//! - `CIRCLE_MOTION` runs the blocking [`CircleManeuver`], then resets the
//!   tracking controller so stale PID history is not applied afterwards.
//!
//! A circle command created while the previous maneuver was flying is
//! dropped: the gesture was made while the aircraft was already circling.
//! Circles queued before a maneuver started still run in order.

use super::circle::CircleManeuver;
use crate::control::tracking::TrackingController;
use crate::platform::FlightPlatform;
use followme_common::channel::CommandReader;
use followme_common::command::{Command, CommandKind, unix_time_us};
use followme_common::config::AppConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// What one poll did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub photos: u32,
    pub circles: u32,
    pub ignored: u32,
    pub failed: u32,
}

impl DispatchSummary {
    pub const fn is_empty(&self) -> bool {
        self.photos == 0 && self.circles == 0 && self.ignored == 0 && self.failed == 0
    }
}

pub struct CommandDispatcher {
    reader: CommandReader,
    circle: CircleManeuver,
    /// Wall-clock span of the last circle [µs since epoch].
    last_circle_us: Option<(u64, u64)>,
}

impl CommandDispatcher {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_reader(CommandReader::new(&config.channel), CircleManeuver::new(&config.circle))
    }

    pub fn with_reader(reader: CommandReader, circle: CircleManeuver) -> Self {
        Self {
            reader,
            circle,
            last_circle_us: None,
        }
    }

    /// Execute every command published since the last poll.
    pub fn poll(
        &mut self,
        platform: &mut dyn FlightPlatform,
        controller: &mut TrackingController,
        shutdown: &AtomicBool,
    ) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        for command in self.reader.read_new() {
            if shutdown.load(Ordering::SeqCst) {
                info!("Shutdown pending, skipping command #{}", command.sequence_number);
                break;
            }
            self.execute(command, platform, controller, shutdown, &mut summary);
        }
        summary
    }

    fn execute(
        &mut self,
        command: Command,
        platform: &mut dyn FlightPlatform,
        controller: &mut TrackingController,
        shutdown: &AtomicBool,
        summary: &mut DispatchSummary,
    ) {
        info!("Command #{}: {}", command.sequence_number, command.kind);
        match command.kind {
            CommandKind::TakePhoto => match platform.capture_photo() {
                Ok(path) => {
                    info!("Photo saved to {}", path.display());
                    summary.photos += 1;
                }
                Err(e) => {
                    warn!("Photo capture failed: {e}");
                    summary.failed += 1;
                }
            },
            CommandKind::CircleMotion => {
                if self
                    .last_circle_us
                    .is_some_and(|(start, end)| (start..=end).contains(&command.created_at))
                {
                    info!(
                        "Ignoring circle #{} issued during the previous maneuver",
                        command.sequence_number
                    );
                    summary.ignored += 1;
                    return;
                }
                let started = unix_time_us();
                self.circle.execute(platform, shutdown);
                self.last_circle_us = Some((started, unix_time_us()));
                controller.reset();
                summary.circles += 1;
            }
        }
    }
}
