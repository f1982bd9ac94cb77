//! Configuration loading traits and types.
//!
//! One TOML file configures both processes. Every section and field has a
//! default, so a partial file (or no file at all) yields a usable
//! [`AppConfig`]. The value is loaded once at startup, validated, and then
//! passed by reference; nothing mutates it afterwards.
//!
//! # Usage
//!
//! ```rust,no_run
//! use followme_common::config::{load_app_config, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let loaded = load_app_config(Some(Path::new("config/followme.toml")))?;
//!     println!("Driver: {} (from {})", loaded.config.platform.driver, loaded.source);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::consts::{DEFAULT_CHANNEL_PATH, DEFAULT_CONFIG_PATH, MAX_DURATION_S, VELOCITY_LIMIT};

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// TOML parsing failed (or the file could not be read).
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Trait for loading configuration from TOML files.
///
/// Blanket-implemented for every `DeserializeOwned` type.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.to_path_buf())
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Sections ───────────────────────────────────────────────────────

/// `[logging]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when `--debug` is not given.
    pub level: LogLevel,
}

/// `[platform]`: flight platform connection and safety envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Registered driver name (see `followme_tracker::platform::PlatformRegistry`).
    pub driver: String,
    /// Camera frame width [px].
    pub frame_width: u32,
    /// Camera frame height [px].
    pub frame_height: u32,
    /// Vertical speed held right after takeoff.
    pub takeoff_ascent_speed: i32,
    /// How long the post-takeoff ascent lasts [s].
    pub takeoff_ascent_duration_s: f64,
    /// Above this altitude [cm] the vertical command is forced to `descend_speed`.
    pub altitude_ceiling_cm: f64,
    /// Above this altitude [cm] the tracker lands. Must exceed the ceiling.
    pub altitude_trip_cm: f64,
    /// Vertical command applied while above the ceiling (negative = down).
    pub descend_speed: i32,
    /// Upper bound on the landing attempt during shutdown [ms].
    pub land_timeout_ms: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            driver: "simulation".to_string(),
            frame_width: 960,
            frame_height: 720,
            takeoff_ascent_speed: 25,
            takeoff_ascent_duration_s: 3.0,
            altitude_ceiling_cm: 220.0,
            altitude_trip_cm: 320.0,
            descend_speed: -10,
            land_timeout_ms: 5000,
        }
    }
}

impl PlatformConfig {
    pub fn takeoff_ascent_duration(&self) -> Duration {
        seconds(self.takeoff_ascent_duration_s)
    }

    pub fn land_timeout(&self) -> Duration {
        Duration::from_millis(self.land_timeout_ms)
    }
}

/// Gains and anti-windup bound for one PID axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Absolute bound of the integral accumulator.
    pub integral_limit: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 0.2,
            ki: 0.04,
            kd: 0.005,
            integral_limit: 500.0,
        }
    }
}

/// `[tracking]`: subject-centering control loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub yaw_pid: PidConfig,
    pub vertical_pid: PidConfig,
    /// Lower edge of the bounding-box area band [px²].
    pub min_area: u32,
    /// Upper edge of the bounding-box area band [px²].
    pub max_area: u32,
    pub yaw_speed_limit: i32,
    pub vertical_speed_limit: i32,
    /// Gain applied to the (inverted) vertical PID output.
    pub vertical_speed_scale: f64,
    /// Forward command when the subject looks too small.
    pub forward_speed: i32,
    /// Forward command when the subject looks too large (negative).
    pub backward_speed: i32,
    /// Horizontal target as a fraction of the frame width.
    pub target_x_fraction: f64,
    /// Vertical target as a fraction of the frame height (upper-frame bias).
    pub target_y_fraction: f64,
    /// Absent ticks tolerated before recovery starts.
    pub lost_frame_threshold: u32,
    /// Yaw speed of the recovery/search rotation (magnitude).
    pub search_rotation_speed: i32,
    /// Control tick period [ms].
    pub loop_interval_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            yaw_pid: PidConfig::default(),
            vertical_pid: PidConfig::default(),
            min_area: 14_000,
            max_area: 15_000,
            yaw_speed_limit: 100,
            vertical_speed_limit: 40,
            vertical_speed_scale: 0.5,
            forward_speed: 20,
            backward_speed: -20,
            target_x_fraction: 0.5,
            target_y_fraction: 0.25,
            lost_frame_threshold: 15,
            search_rotation_speed: 40,
            loop_interval_ms: 100,
        }
    }
}

impl TrackingConfig {
    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }
}

/// `[circle]`: panoramic circle maneuver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleConfig {
    /// Lateral speed held during the circle.
    pub lateral_speed: i32,
    /// Yaw speed held during the circle.
    pub yaw_speed: i32,
    /// Maneuver duration [s].
    pub duration_s: f64,
    /// Command period inside the maneuver [ms].
    pub tick_ms: u64,
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            lateral_speed: -15,
            yaw_speed: 35,
            duration_s: 20.0,
            tick_ms: 50,
        }
    }
}

impl CircleConfig {
    pub fn duration(&self) -> Duration {
        seconds(self.duration_s)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// `[detector]`: reference bright-region detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Pixels at or above this luminance belong to the subject.
    pub luminance_threshold: u8,
    /// Regions smaller than this [px²] are ignored.
    pub min_area: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            luminance_threshold: 200,
            min_area: 100,
        }
    }
}

/// `[gesture]`: serial sensor link and snap detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub serial_port: PathBuf,
    pub baud_rate: u32,
    /// Serial read timeout [ms]; a timeout means "no new readings".
    pub read_timeout_ms: u64,
    /// Magnitude difference that counts as a snap.
    pub snap_threshold: i64,
    /// Readings below this are treated as sensor glitches.
    pub valid_min: i64,
    /// Readings above this are treated as saturation.
    pub valid_max: i64,
    /// Gesture window, fixed from the first snap [s].
    pub window_s: f64,
    /// Minimum spacing between two registered snaps [s].
    pub min_gap_s: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            serial_port: PathBuf::from("/dev/ttyUSB0"),
            baud_rate: 38_400,
            read_timeout_ms: 100,
            snap_threshold: 50_000,
            valid_min: 0,
            valid_max: 1_000_000,
            window_s: 0.7,
            min_gap_s: 0.15,
        }
    }
}

impl GestureConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn window(&self) -> Duration {
        seconds(self.window_s)
    }

    pub fn min_gap(&self) -> Duration {
        seconds(self.min_gap_s)
    }
}

/// `[channel]`: file-based command channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub path: PathBuf,
    /// Newest entries kept in the persisted queue.
    pub retain: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CHANNEL_PATH),
            retain: 256,
        }
    }
}

/// `[capture]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Directory for photos and recordings.
    pub output_dir: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("captures"),
        }
    }
}

/// `[simulation]`: world model of the `simulation` platform driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Subject bearing relative to the initial heading [deg].
    pub subject_bearing_deg: f64,
    /// Height of the subject's face above ground [cm].
    pub subject_height_cm: f64,
    /// Initial horizontal distance to the subject [cm].
    pub subject_distance_cm: f64,
    /// Physical face width [cm].
    pub subject_width_cm: f64,
    /// Physical face height [cm].
    pub subject_extent_cm: f64,
    pub horizontal_fov_deg: f64,
    pub vertical_fov_deg: f64,
    /// Yaw rate per velocity unit [deg/s].
    pub yaw_rate: f64,
    /// Linear rate per velocity unit [cm/s].
    pub linear_rate: f64,
    /// Closest approach to the subject [cm].
    pub min_distance_cm: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            subject_bearing_deg: 30.0,
            subject_height_cm: 170.0,
            subject_distance_cm: 150.0,
            subject_width_cm: 16.0,
            subject_extent_cm: 22.0,
            horizontal_fov_deg: 82.6,
            vertical_fov_deg: 62.0,
            yaw_rate: 1.0,
            linear_rate: 1.0,
            min_distance_cm: 40.0,
        }
    }
}

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete configuration shared by both processes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub platform: PlatformConfig,
    pub tracking: TrackingConfig,
    pub circle: CircleConfig,
    pub detector: DetectorConfig,
    pub gesture: GestureConfig,
    pub channel: ChannelConfig,
    pub capture: CaptureConfig,
    pub simulation: SimulationConfig,
}

impl AppConfig {
    /// Parse from a TOML string and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate parameter bounds and cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.platform;
        let t = &self.tracking;
        let g = &self.gesture;

        if p.driver.is_empty() {
            return invalid("platform.driver cannot be empty");
        }
        if p.frame_width == 0 || p.frame_height == 0 {
            return invalid(format!(
                "frame size {}x{} must be non-zero",
                p.frame_width, p.frame_height
            ));
        }
        if !(p.altitude_ceiling_cm.is_finite() && p.altitude_ceiling_cm > 0.0) {
            return invalid("platform.altitude_ceiling_cm must be positive");
        }
        if !(p.altitude_trip_cm > p.altitude_ceiling_cm) {
            return invalid(format!(
                "altitude_trip_cm {} must exceed altitude_ceiling_cm {}",
                p.altitude_trip_cm, p.altitude_ceiling_cm
            ));
        }
        if p.descend_speed >= 0 {
            return invalid("platform.descend_speed must be negative");
        }
        check_duration("platform.takeoff_ascent_duration_s", p.takeoff_ascent_duration_s)?;
        check_speed("platform.takeoff_ascent_speed", p.takeoff_ascent_speed)?;
        check_speed("platform.descend_speed", p.descend_speed)?;

        for (name, pid) in [("tracking.yaw_pid", &t.yaw_pid), ("tracking.vertical_pid", &t.vertical_pid)] {
            if !(pid.kp.is_finite() && pid.ki.is_finite() && pid.kd.is_finite()) {
                return invalid(format!("{name} gains must be finite"));
            }
            if !(pid.integral_limit.is_finite() && pid.integral_limit >= 0.0) {
                return invalid(format!("{name}.integral_limit must be >= 0"));
            }
        }
        if t.min_area > t.max_area {
            return invalid(format!(
                "tracking.min_area {} exceeds max_area {}",
                t.min_area, t.max_area
            ));
        }
        if t.yaw_speed_limit <= 0 || t.vertical_speed_limit <= 0 {
            return invalid("tracking speed limits must be positive");
        }
        check_speed("tracking.yaw_speed_limit", t.yaw_speed_limit)?;
        check_speed("tracking.vertical_speed_limit", t.vertical_speed_limit)?;
        check_speed("tracking.forward_speed", t.forward_speed)?;
        check_speed("tracking.backward_speed", t.backward_speed)?;
        check_speed("tracking.search_rotation_speed", t.search_rotation_speed)?;
        for (name, fraction) in [
            ("tracking.target_x_fraction", t.target_x_fraction),
            ("tracking.target_y_fraction", t.target_y_fraction),
        ] {
            if !(0.0..=1.0).contains(&fraction) {
                return invalid(format!("{name} {fraction} out of range [0, 1]"));
            }
        }
        if !(t.vertical_speed_scale.is_finite() && t.vertical_speed_scale >= 0.0) {
            return invalid(format!(
                "tracking.vertical_speed_scale {} must be finite and >= 0",
                t.vertical_speed_scale
            ));
        }
        if t.loop_interval_ms == 0 {
            return invalid("tracking.loop_interval_ms must be > 0");
        }

        check_duration("circle.duration_s", self.circle.duration_s)?;
        check_speed("circle.lateral_speed", self.circle.lateral_speed)?;
        check_speed("circle.yaw_speed", self.circle.yaw_speed)?;
        if self.circle.tick_ms == 0 {
            return invalid("circle.tick_ms must be > 0");
        }

        if g.baud_rate == 0 {
            return invalid("gesture.baud_rate must be > 0");
        }
        if g.snap_threshold <= 0 {
            return invalid("gesture.snap_threshold must be positive");
        }
        if g.valid_min > g.valid_max {
            return invalid(format!(
                "gesture valid range [{}, {}] is empty",
                g.valid_min, g.valid_max
            ));
        }
        check_duration("gesture.window_s", g.window_s)?;
        if g.window_s == 0.0 {
            return invalid("gesture.window_s must be positive");
        }
        if !(g.min_gap_s.is_finite() && g.min_gap_s >= 0.0 && g.min_gap_s < g.window_s) {
            return invalid(format!(
                "gesture.min_gap_s {} must lie in [0, window_s)",
                g.min_gap_s
            ));
        }

        if self.channel.retain == 0 {
            return invalid("channel.retain must be > 0");
        }
        Ok(())
    }
}

/// Seconds to `Duration`, saturating into `[0, MAX_DURATION_S]`; NaN is zero.
fn seconds(value: f64) -> Duration {
    if value.is_nan() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(value.clamp(0.0, MAX_DURATION_S))
}

fn invalid(msg: impl Into<String>) -> Result<(), ConfigError> {
    Err(ConfigError::ValidationError(msg.into()))
}

fn check_duration(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(value.is_finite() && (0.0..=MAX_DURATION_S).contains(&value)) {
        return invalid(format!("{name} {value} out of range [0, {MAX_DURATION_S}] s"));
    }
    Ok(())
}

fn check_speed(name: &str, value: i32) -> Result<(), ConfigError> {
    if value.unsigned_abs() > VELOCITY_LIMIT.unsigned_abs() {
        return invalid(format!(
            "{name} {value} out of range [-{VELOCITY_LIMIT}, {VELOCITY_LIMIT}]"
        ));
    }
    Ok(())
}

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file.
    File(PathBuf),
    /// Default path absent; built-in defaults in use.
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Defaults => write!(f, "built-in defaults ({DEFAULT_CONFIG_PATH} not found)"),
        }
    }
}

/// Validated configuration plus its origin, ready for runtime use.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub source: ConfigSource,
}

/// Load and validate the application configuration.
///
/// With `path == None` the default location is tried and built-in defaults
/// are used when it does not exist. An explicit path must exist.
pub fn load_app_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let (config, source) = match path {
        Some(path) => (AppConfig::load(path)?, ConfigSource::File(path.to_path_buf())),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            match AppConfig::load(default_path) {
                Ok(config) => (config, ConfigSource::File(default_path.to_path_buf())),
                Err(ConfigError::FileNotFound(_)) => (AppConfig::default(), ConfigSource::Defaults),
                Err(e) => return Err(e),
            }
        }
    };

    config.validate()?;
    Ok(LoadedConfig { config, source })
}
