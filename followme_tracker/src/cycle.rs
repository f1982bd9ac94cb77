//! Tracking loop: sense → decide → act, at a fixed period.
//!
//! ## Startup
//! 1. `connect()` to the platform.
//! 2. `takeoff()`, then climb at `takeoff_ascent_speed` for
//!    `takeoff_ascent_duration_s`.
//!
//! ## Tick
//! Grab a frame, detect the subject, read altitude, let the
//! [`TrackingController`] decide, send the velocity command, then poll the
//! command channel. A platform error at any step skips the rest of the tick.
//!
//! ## Shutdown
//! The shutdown flag (set by the signal handler) or an altitude trip moves
//! the controller to Landing; the loop exits and lands with a bounded wait.

use crate::command::dispatch::{CommandDispatcher, DispatchSummary};
use crate::control::tracking::{TickDecision, TrackingController};
use crate::detector::SubjectDetector;
use crate::error::TrackerError;
use crate::platform::{FlightPlatform, PlatformError, VelocityCommand};
use crate::safety::landing::{LandingOutcome, land_with_timeout};
use crate::state::{LandingReason, TrackingState};
use followme_common::config::AppConfig;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

// ─── Loop Statistics ────────────────────────────────────────────────

/// Per-tick timing and outcome counters.
#[derive(Debug, Clone, Default)]
pub struct LoopStats {
    pub ticks: u64,
    /// Ticks abandoned because of a platform error.
    pub skipped: u64,
    /// Ticks whose work (maneuvers included) outlasted the period.
    pub overruns: u64,
    pub max_tick: Duration,
    pub last_tick: Duration,
}

impl LoopStats {
    pub fn record(&mut self, duration: Duration, interval: Duration) {
        self.ticks += 1;
        self.last_tick = duration;
        self.max_tick = self.max_tick.max(duration);
        if duration > interval {
            self.overruns += 1;
        }
    }
}

// ─── Tick Outcome ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// A velocity command was sent.
    Commanded {
        decision: TickDecision,
        dispatched: DispatchSummary,
    },
    /// A platform call failed; nothing further happened this tick.
    Skipped(PlatformError),
    /// The controller is in Landing; nothing was sent.
    Landing,
}

/// Final report of [`TrackingLoop::run`].
#[derive(Debug, Clone)]
pub struct LoopExit {
    pub stats: LoopStats,
    pub landing: LandingOutcome,
}

// ─── Loop ───────────────────────────────────────────────────────────

pub struct TrackingLoop {
    platform: Box<dyn FlightPlatform>,
    detector: Box<dyn SubjectDetector>,
    controller: TrackingController,
    dispatcher: CommandDispatcher,
    shutdown: Arc<AtomicBool>,
    interval: Duration,
    ascent_speed: i32,
    ascent_duration: Duration,
    land_timeout: Duration,
    stats: LoopStats,
}

impl TrackingLoop {
    pub fn new(
        config: &AppConfig,
        platform: Box<dyn FlightPlatform>,
        detector: Box<dyn SubjectDetector>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, TrackerError> {
        Ok(Self {
            platform,
            detector,
            controller: TrackingController::new(&config.tracking, &config.platform)?,
            dispatcher: CommandDispatcher::new(config),
            shutdown,
            interval: config.tracking.loop_interval(),
            ascent_speed: config.platform.takeoff_ascent_speed,
            ascent_duration: config.platform.takeoff_ascent_duration(),
            land_timeout: config.platform.land_timeout(),
            stats: LoopStats::default(),
        })
    }

    #[inline]
    pub fn controller(&self) -> &TrackingController {
        &self.controller
    }

    #[inline]
    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn platform_mut(&mut self) -> &mut dyn FlightPlatform {
        self.platform.as_mut()
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Connect, take off and climb to working height.
    ///
    /// Errors are returned only while still on the ground. Once airborne,
    /// a failed ascent or hover command is logged and the loop takes over,
    /// so [`run`](Self::run) always gets the chance to land.
    pub fn start(&mut self) -> Result<(), TrackerError> {
        self.platform.connect()?;
        info!("Connected to platform '{}'", self.platform.name());

        self.platform.takeoff()?;
        info!("Airborne");

        if self.ascent_duration.is_zero() || self.ascent_speed == 0 {
            return Ok(());
        }
        let ascent = VelocityCommand::new(0, 0, self.ascent_speed, 0);
        if let Err(e) = self.platform.send_velocity(ascent) {
            warn!("Ascent command failed, continuing at takeoff height: {e}");
            return Ok(());
        }
        let until = Instant::now() + self.ascent_duration;
        while Instant::now() < until && !self.shutdown_requested() {
            thread::sleep(self.interval.min(until.saturating_duration_since(Instant::now())));
        }
        match self.platform.send_velocity(VelocityCommand::HOVER) {
            Ok(()) => debug!("Ascent complete"),
            Err(e) => warn!("Hover after ascent failed: {e}"),
        }
        Ok(())
    }

    /// Run one tick at time `now`.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if self.controller.state().is_terminal() {
            return TickOutcome::Landing;
        }

        let frame = match self.platform.grab_frame() {
            Ok(frame) => frame,
            Err(e) => return self.skip(e),
        };
        let observation = self.detector.detect(&frame);

        let altitude = match self.platform.altitude_cm() {
            Ok(altitude) => altitude,
            Err(e) => return self.skip(e),
        };

        let decision = self.controller.tick(observation, altitude, now);
        if decision.state.is_terminal() {
            return TickOutcome::Landing;
        }

        if let Err(e) = self.platform.send_velocity(decision.command) {
            return self.skip(e);
        }
        trace!(
            "{} alt={altitude:.0} {}",
            decision.state,
            decision.command
        );

        let dispatched =
            self.dispatcher
                .poll(self.platform.as_mut(), &mut self.controller, &self.shutdown);

        TickOutcome::Commanded {
            decision,
            dispatched,
        }
    }

    fn skip(&mut self, error: PlatformError) -> TickOutcome {
        self.stats.skipped += 1;
        warn!("Tick skipped: {error}");
        TickOutcome::Skipped(error)
    }

    /// Tick until landing is required, then land.
    pub fn run(mut self) -> LoopExit {
        info!("Tracking loop running at {} ms", self.interval.as_millis());
        let mut next = Instant::now();

        loop {
            if self.shutdown_requested() {
                self.controller.begin_landing(LandingReason::Shutdown);
            }
            if self.controller.state() == TrackingState::Landing {
                break;
            }

            let started = Instant::now();
            self.tick(started);
            self.stats.record(started.elapsed(), self.interval);

            next += self.interval;
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            } else {
                // Behind schedule (e.g. after a maneuver): resynchronise.
                next = now;
            }
        }

        info!(
            "Loop stopped after {} ticks ({} skipped, {} overruns, max {} ms)",
            self.stats.ticks,
            self.stats.skipped,
            self.stats.overruns,
            self.stats.max_tick.as_millis()
        );

        let landing = land_with_timeout(self.platform, self.land_timeout);
        LoopExit {
            stats: self.stats,
            landing,
        }
    }
}
