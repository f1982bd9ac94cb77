//! Flight platform boundary.
//!
//! This module defines:
//! - `FlightPlatform` trait - what the tracker needs from an aircraft
//! - `PlatformError` enum - error types for platform operations
//! - `VelocityCommand` - one clamped four-axis velocity set-point
//! - `Frame` - one grayscale camera frame
//!
//! Drivers are created through [`registry::PlatformRegistry`]; the only
//! built-in driver is [`simulation::SimulatedPlatform`].

pub mod registry;
pub mod simulation;

use followme_common::consts::VELOCITY_LIMIT;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

/// Error types for platform operations.
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    /// Link to the aircraft is down or timed out.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The aircraft refused the request (e.g. not airborne).
    #[error("Command rejected: {0}")]
    Rejected(String),

    /// No driver registered under this name.
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Photo or video capture failed.
    #[error("Capture error: {0}")]
    Capture(String),
}

/// Factory function type for creating platform drivers.
pub type PlatformFactory =
    fn(&followme_common::config::AppConfig) -> Result<Box<dyn FlightPlatform>, PlatformError>;

/// Four-axis velocity set-point, each component within `±VELOCITY_LIMIT`.
///
/// Positive lateral is right, positive forward is toward the subject,
/// positive vertical is up, positive yaw is clockwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VelocityCommand {
    pub lateral: i32,
    pub forward: i32,
    pub vertical: i32,
    pub yaw: i32,
}

impl VelocityCommand {
    /// Zero velocity on every axis.
    pub const HOVER: Self = Self {
        lateral: 0,
        forward: 0,
        vertical: 0,
        yaw: 0,
    };

    /// Build a command, clamping every component to `±VELOCITY_LIMIT`.
    pub fn new(lateral: i32, forward: i32, vertical: i32, yaw: i32) -> Self {
        Self {
            lateral: clamp_speed(lateral),
            forward: clamp_speed(forward),
            vertical: clamp_speed(vertical),
            yaw: clamp_speed(yaw),
        }
    }

    #[inline]
    pub fn is_hover(&self) -> bool {
        *self == Self::HOVER
    }
}

impl fmt::Display for VelocityCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lr={} fb={} ud={} yaw={}",
            self.lateral, self.forward, self.vertical, self.yaw
        )
    }
}

/// Clamp one velocity component to `±VELOCITY_LIMIT`.
#[inline]
pub fn clamp_speed(value: i32) -> i32 {
    value.clamp(-VELOCITY_LIMIT, VELOCITY_LIMIT)
}

/// Round a continuous controller output into a clamped velocity component.
#[inline]
pub fn speed_from_f64(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let limit = f64::from(VELOCITY_LIMIT);
    value.round().clamp(-limit, limit) as i32
}

/// One 8-bit grayscale camera frame, row-major.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub captured_at: Instant,
}

impl Frame {
    /// Uniformly filled frame.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width as usize * height as usize],
            captured_at: Instant::now(),
        }
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Binary PGM (P5) encoding.
    pub fn to_pgm(&self) -> Vec<u8> {
        let header = format!("P5\n{} {}\n255\n", self.width, self.height);
        let mut out = Vec::with_capacity(header.len() + self.pixels.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&self.pixels);
        out
    }
}

/// What the tracker needs from an aircraft.
///
/// # Lifecycle
///
/// 1. `connect()` - establish the link, start the video stream
/// 2. `takeoff()` - lift off to hover height
/// 3. `grab_frame()` / `altitude_cm()` / `send_velocity()` every tick
/// 4. `land()` then `shutdown()`
///
/// Implementations must be `Send`: landing runs on a helper thread so the
/// shutdown path can bound how long it waits.
pub trait FlightPlatform: Send {
    /// Driver identifier (e.g. "simulation").
    fn name(&self) -> &'static str;

    fn connect(&mut self) -> Result<(), PlatformError>;

    fn takeoff(&mut self) -> Result<(), PlatformError>;

    fn land(&mut self) -> Result<(), PlatformError>;

    /// Apply a velocity set-point until the next one arrives.
    fn send_velocity(&mut self, command: VelocityCommand) -> Result<(), PlatformError>;

    /// Current height above ground [cm].
    fn altitude_cm(&mut self) -> Result<f64, PlatformError>;

    /// Latest camera frame.
    fn grab_frame(&mut self) -> Result<Frame, PlatformError>;

    /// Store a still capture and return its location.
    fn capture_photo(&mut self) -> Result<PathBuf, PlatformError>;

    /// Begin continuous capture of every grabbed frame.
    fn start_video(&mut self) -> Result<(), PlatformError>;

    /// Finish continuous capture and return the recording's location.
    fn stop_video(&mut self) -> Result<PathBuf, PlatformError>;

    /// Release the link. Called after landing.
    fn shutdown(&mut self) -> Result<(), PlatformError> {
        Ok(())
    }
}
