//! System-wide constants for the follow-me workspace.
//!
//! Single source of truth for numeric limits and default paths.
//! Configuration defaults live next to their config structs.

/// Default configuration file path (relative to the working directory).
pub const DEFAULT_CONFIG_PATH: &str = "config/followme.toml";

/// Default command channel file.
pub const DEFAULT_CHANNEL_PATH: &str = "run/commands.json";

/// Symmetric limit of every velocity component sent to the platform.
pub const VELOCITY_LIMIT: i32 = 100;

/// Persisted command queue format version.
pub const CHANNEL_FORMAT_VERSION: u32 = 1;

/// Smallest `dt` [s] used for the PID derivative term.
pub const PID_DT_EPSILON: f64 = 1e-3;


/// Longest accepted configured duration [s] (one hour).
pub const MAX_DURATION_S: f64 = 3600.0;
