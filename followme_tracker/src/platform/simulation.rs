//! Simulation platform driver.
//!
//! `SimulatedPlatform` implements [`FlightPlatform`] on top of a kinematic
//! world model so the tracker can be developed and tested without an
//! aircraft. The subject is a face-sized rectangle at a fixed ground
//! position; frames are rendered as a bright box on a dark background.
//!
//! ## Coordinates
//!
//! Plan view, `x` east and `y` north [cm]. Heading 0° faces north and grows
//! clockwise, matching positive yaw commands. The aircraft starts at the
//! origin facing north.

use super::{FlightPlatform, Frame, PlatformError, VelocityCommand};
use followme_common::command::unix_time_us;
use followme_common::config::{AppConfig, SimulationConfig};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Height reached by `takeoff()` [cm].
pub const TAKEOFF_HEIGHT_CM: f64 = 80.0;

/// Longest interval integrated in one world step.
const MAX_STEP: Duration = Duration::from_millis(500);

const BACKGROUND_LUMA: u8 = 30;
const SUBJECT_LUMA: u8 = 230;

/// Subject bounding box in pixel coordinates, clipped to the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub left: u32,
    pub top: u32,
    /// Exclusive.
    pub right: u32,
    /// Exclusive.
    pub bottom: u32,
}

impl PixelBox {
    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.left + self.right) / 2.0,
            f64::from(self.top + self.bottom) / 2.0,
        )
    }

    pub fn area(&self) -> u32 {
        (self.right - self.left) * (self.bottom - self.top)
    }
}

// ─── World Model ────────────────────────────────────────────────────

/// Kinematic state of the aircraft and subject.
#[derive(Debug, Clone)]
pub struct SimWorld {
    config: SimulationConfig,
    frame_width: u32,
    frame_height: u32,
    x: f64,
    y: f64,
    heading_deg: f64,
    altitude_cm: f64,
    airborne: bool,
    subject_x: f64,
    subject_y: f64,
}

impl SimWorld {
    pub fn new(config: &SimulationConfig, frame_width: u32, frame_height: u32) -> Self {
        let bearing = config.subject_bearing_deg.to_radians();
        Self {
            config: config.clone(),
            frame_width,
            frame_height,
            x: 0.0,
            y: 0.0,
            heading_deg: 0.0,
            altitude_cm: 0.0,
            airborne: false,
            subject_x: config.subject_distance_cm * bearing.sin(),
            subject_y: config.subject_distance_cm * bearing.cos(),
        }
    }

    /// Integrate `command` over `dt` seconds. No-op while grounded.
    pub fn step(&mut self, command: VelocityCommand, dt: f64) {
        if !self.airborne || dt <= 0.0 {
            return;
        }

        self.heading_deg =
            (self.heading_deg + f64::from(command.yaw) * self.config.yaw_rate * dt).rem_euclid(360.0);

        let heading = self.heading_deg.to_radians();
        let (forward_x, forward_y) = (heading.sin(), heading.cos());
        let (right_x, right_y) = (heading.cos(), -heading.sin());
        let scale = self.config.linear_rate * dt;
        let forward = f64::from(command.forward);
        let lateral = f64::from(command.lateral);

        self.x += (forward_x * forward + right_x * lateral) * scale;
        self.y += (forward_y * forward + right_y * lateral) * scale;
        self.altitude_cm = (self.altitude_cm + f64::from(command.vertical) * scale).max(0.0);

        self.keep_clear_of_subject();
    }

    fn keep_clear_of_subject(&mut self) {
        let min = self.config.min_distance_cm;
        let dx = self.x - self.subject_x;
        let dy = self.y - self.subject_y;
        let distance = dx.hypot(dy);
        if distance >= min {
            return;
        }
        if distance < f64::EPSILON {
            self.y = self.subject_y - min;
        } else {
            self.x = self.subject_x + dx / distance * min;
            self.y = self.subject_y + dy / distance * min;
        }
    }

    pub fn take_off(&mut self) {
        self.airborne = true;
        self.altitude_cm = self.altitude_cm.max(TAKEOFF_HEIGHT_CM);
    }

    pub fn touch_down(&mut self) {
        self.airborne = false;
        self.altitude_cm = 0.0;
    }

    #[inline]
    pub const fn airborne(&self) -> bool {
        self.airborne
    }

    #[inline]
    pub const fn altitude_cm(&self) -> f64 {
        self.altitude_cm
    }

    pub fn set_altitude_cm(&mut self, altitude_cm: f64) {
        self.altitude_cm = altitude_cm.max(0.0);
    }

    #[inline]
    pub const fn heading_deg(&self) -> f64 {
        self.heading_deg
    }

    /// Horizontal distance to the subject [cm].
    pub fn distance_cm(&self) -> f64 {
        (self.subject_x - self.x).hypot(self.subject_y - self.y)
    }

    /// Subject bearing relative to the heading, in `(-180, 180]` degrees.
    pub fn relative_bearing_deg(&self) -> f64 {
        let bearing = (self.subject_x - self.x)
            .atan2(self.subject_y - self.y)
            .to_degrees();
        let relative = (bearing - self.heading_deg).rem_euclid(360.0);
        if relative > 180.0 { relative - 360.0 } else { relative }
    }

    /// Project the subject into the camera image.
    ///
    /// `None` when it is behind the camera or entirely outside the frame.
    pub fn subject_box(&self) -> Option<PixelBox> {
        let distance = self.distance_cm();
        let relative = self.relative_bearing_deg();
        if distance < 1.0 || relative.abs() >= 90.0 {
            return None;
        }

        let width = f64::from(self.frame_width);
        let height = f64::from(self.frame_height);
        let tan_half_h = (self.config.horizontal_fov_deg / 2.0).to_radians().tan();
        let tan_half_v = (self.config.vertical_fov_deg / 2.0).to_radians().tan();

        let center_x = width / 2.0 * (1.0 + relative.to_radians().tan() / tan_half_h);
        let elevation = (self.config.subject_height_cm - self.altitude_cm).atan2(distance);
        let center_y = height / 2.0 * (1.0 - elevation.tan() / tan_half_v);

        let box_w = self.config.subject_width_cm / (2.0 * distance * tan_half_h) * width;
        let box_h = self.config.subject_extent_cm / (2.0 * distance * tan_half_v) * height;

        let left = (center_x - box_w / 2.0).clamp(0.0, width);
        let right = (center_x + box_w / 2.0).clamp(0.0, width);
        let top = (center_y - box_h / 2.0).clamp(0.0, height);
        let bottom = (center_y + box_h / 2.0).clamp(0.0, height);

        let pixel_box = PixelBox {
            left: left.round() as u32,
            top: top.round() as u32,
            right: right.round() as u32,
            bottom: bottom.round() as u32,
        };
        (pixel_box.right > pixel_box.left && pixel_box.bottom > pixel_box.top).then_some(pixel_box)
    }

    /// Render the current camera view.
    pub fn render(&self) -> Frame {
        let mut frame = Frame::filled(self.frame_width, self.frame_height, BACKGROUND_LUMA);
        if let Some(b) = self.subject_box() {
            for row in b.top..b.bottom {
                let start = (row * self.frame_width + b.left) as usize;
                let end = (row * self.frame_width + b.right) as usize;
                frame.pixels[start..end].fill(SUBJECT_LUMA);
            }
        }
        frame
    }
}

// ─── Driver ─────────────────────────────────────────────────────────

struct Recording {
    path: PathBuf,
    writer: BufWriter<File>,
    frames: u64,
}

/// Simulation driver implementing the `FlightPlatform` trait.
pub struct SimulatedPlatform {
    world: SimWorld,
    output_dir: PathBuf,
    connected: bool,
    current: VelocityCommand,
    last_step: Option<Instant>,
    recording: Option<Recording>,
    captures: u64,
}

impl SimulatedPlatform {
    pub const NAME: &'static str = "simulation";

    pub fn new(config: &AppConfig) -> Self {
        Self {
            world: SimWorld::new(
                &config.simulation,
                config.platform.frame_width,
                config.platform.frame_height,
            ),
            output_dir: config.capture.output_dir.clone(),
            connected: false,
            current: VelocityCommand::HOVER,
            last_step: None,
            recording: None,
            captures: 0,
        }
    }

    /// Registry factory.
    pub fn factory(config: &AppConfig) -> Result<Box<dyn FlightPlatform>, PlatformError> {
        Ok(Box::new(Self::new(config)))
    }

    pub fn world(&self) -> &SimWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut SimWorld {
        &mut self.world
    }

    /// Integrate the active command up to now.
    fn advance(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_step {
            let dt = now.saturating_duration_since(last).min(MAX_STEP);
            self.world.step(self.current, dt.as_secs_f64());
        }
        self.last_step = Some(now);
    }

    fn ensure_connected(&self) -> Result<(), PlatformError> {
        if self.connected {
            Ok(())
        } else {
            Err(PlatformError::Connection("not connected".into()))
        }
    }

    fn capture_path(&mut self, prefix: &str, extension: &str) -> PathBuf {
        self.captures += 1;
        self.output_dir.join(format!(
            "{prefix}_{}_{}.{extension}",
            unix_time_us(),
            self.captures
        ))
    }
}

fn capture_error(path: &Path, e: std::io::Error) -> PlatformError {
    PlatformError::Capture(format!("{}: {e}", path.display()))
}

impl FlightPlatform for SimulatedPlatform {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn connect(&mut self) -> Result<(), PlatformError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| capture_error(&self.output_dir, e))?;
        self.connected = true;
        self.last_step = Some(Instant::now());
        info!(
            "Simulated platform connected (subject at {:.0} cm, {:.0}°)",
            self.world.distance_cm(),
            self.world.relative_bearing_deg()
        );
        Ok(())
    }

    fn takeoff(&mut self) -> Result<(), PlatformError> {
        self.ensure_connected()?;
        self.advance();
        self.world.take_off();
        self.current = VelocityCommand::HOVER;
        Ok(())
    }

    fn land(&mut self) -> Result<(), PlatformError> {
        self.ensure_connected()?;
        self.advance();
        self.world.touch_down();
        self.current = VelocityCommand::HOVER;
        Ok(())
    }

    fn send_velocity(&mut self, command: VelocityCommand) -> Result<(), PlatformError> {
        self.ensure_connected()?;
        if !self.world.airborne() {
            return Err(PlatformError::Rejected("not airborne".into()));
        }
        self.advance();
        self.current = command;
        Ok(())
    }

    fn altitude_cm(&mut self) -> Result<f64, PlatformError> {
        self.ensure_connected()?;
        self.advance();
        Ok(self.world.altitude_cm())
    }

    fn grab_frame(&mut self) -> Result<Frame, PlatformError> {
        self.ensure_connected()?;
        self.advance();
        let frame = self.world.render();
        if let Some(recording) = self.recording.as_mut() {
            recording
                .writer
                .write_all(&frame.to_pgm())
                .map_err(|e| capture_error(&recording.path, e))?;
            recording.frames += 1;
        }
        Ok(frame)
    }

    fn capture_photo(&mut self) -> Result<PathBuf, PlatformError> {
        self.ensure_connected()?;
        self.advance();
        let frame = self.world.render();
        let path = self.capture_path("photo", "pgm");
        fs::write(&path, frame.to_pgm()).map_err(|e| capture_error(&path, e))?;
        Ok(path)
    }

    fn start_video(&mut self) -> Result<(), PlatformError> {
        self.ensure_connected()?;
        if self.recording.is_some() {
            return Err(PlatformError::Rejected("recording already active".into()));
        }
        let path = self.capture_path("video", "pgm");
        let file = File::create(&path).map_err(|e| capture_error(&path, e))?;
        debug!("Recording to {}", path.display());
        self.recording = Some(Recording {
            path,
            writer: BufWriter::new(file),
            frames: 0,
        });
        Ok(())
    }

    fn stop_video(&mut self) -> Result<PathBuf, PlatformError> {
        let Some(mut recording) = self.recording.take() else {
            return Err(PlatformError::Rejected("no active recording".into()));
        };
        recording
            .writer
            .flush()
            .map_err(|e| capture_error(&recording.path, e))?;
        debug!("Recorded {} frames", recording.frames);
        Ok(recording.path)
    }

    fn shutdown(&mut self) -> Result<(), PlatformError> {
        if self.recording.is_some() {
            self.stop_video()?;
        }
        self.connected = false;
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
