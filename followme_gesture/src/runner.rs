//! Gesture loop: read sensors → detect snaps → close windows → publish.
//!
//! Each step performs one bounded serial read. Readings are timestamped
//! on arrival, fed through the [`SnapDetector`] and [`GestureRecognizer`],
//! and every completed gesture is appended to the command channel. The
//! window is also polled on steps that deliver no readings, so a gesture
//! completes on time even when the sensors go quiet.

use crate::gesture::GestureRecognizer;
use crate::sensor::SensorLink;
use crate::snap::SnapDetector;
use followme_common::channel::CommandWriter;
use followme_common::command::{Command, CommandKind};
use followme_common::config::AppConfig;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Log every this many consecutive serial errors.
const SERIAL_ERROR_LOG_EVERY: u64 = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GestureStats {
    pub readings: u64,
    pub snaps: u64,
    pub published: u64,
    pub publish_failures: u64,
    pub serial_errors: u64,
}

pub struct GestureLoop<R> {
    link: SensorLink<R>,
    detector: SnapDetector,
    recognizer: GestureRecognizer,
    writer: CommandWriter,
    error_backoff: Duration,
    consecutive_errors: u64,
    stats: GestureStats,
}

impl<R: Read> GestureLoop<R> {
    pub fn new(reader: R, config: &AppConfig, writer: CommandWriter) -> Self {
        Self {
            link: SensorLink::new(reader),
            detector: SnapDetector::from_config(&config.gesture),
            recognizer: GestureRecognizer::from_config(&config.gesture),
            writer,
            error_backoff: config.gesture.read_timeout(),
            consecutive_errors: 0,
            stats: GestureStats::default(),
        }
    }

    pub fn stats(&self) -> &GestureStats {
        &self.stats
    }

    pub fn recognizer(&self) -> &GestureRecognizer {
        &self.recognizer
    }

    /// One read-and-process step; returns the commands published.
    pub fn step(&mut self) -> Vec<Command> {
        let mut completed = Vec::new();

        match self.link.poll() {
            Ok(readings) => {
                if self.consecutive_errors > 0 {
                    info!("Serial link recovered after {} errors", self.consecutive_errors);
                    self.consecutive_errors = 0;
                }
                let now = Instant::now();
                for reading in readings {
                    self.stats.readings += 1;
                    if let Some(event) = self.detector.sample(reading, now) {
                        self.stats.snaps += 1;
                        completed.extend(self.recognizer.on_event(&event));
                    }
                }
            }
            Err(e) => {
                self.stats.serial_errors += 1;
                self.consecutive_errors += 1;
                if self.consecutive_errors % SERIAL_ERROR_LOG_EVERY == 1 {
                    warn!("Serial read failed ({} in a row): {e}", self.consecutive_errors);
                }
                thread::sleep(self.error_backoff);
            }
        }

        completed.extend(self.recognizer.poll(Instant::now()));
        completed
            .into_iter()
            .filter_map(|kind| self.publish(kind))
            .collect()
    }

    fn publish(&mut self, kind: CommandKind) -> Option<Command> {
        match self.writer.publish(kind) {
            Ok(command) => {
                info!("Published {} as #{}", command.kind, command.sequence_number);
                self.stats.published += 1;
                Some(command)
            }
            Err(e) => {
                error!("Failed to publish {kind}: {e}");
                self.stats.publish_failures += 1;
                None
            }
        }
    }

    /// Step until `shutdown` is set.
    pub fn run(mut self, shutdown: &AtomicBool) -> GestureStats {
        info!("Gesture loop running");
        while !shutdown.load(Ordering::SeqCst) {
            self.step();
        }
        info!(
            "Gesture loop stopped: {} readings, {} snaps, {} commands, {} lines discarded",
            self.stats.readings,
            self.stats.snaps,
            self.stats.published,
            self.link.discarded()
        );
        self.stats
    }
}
