//! Prelude module for common re-exports.
//!
//! ```rust
//! use followme_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    AppConfig, ConfigError, ConfigLoader, ConfigSource, LoadedConfig, LogLevel, load_app_config,
};

// ─── Commands ───────────────────────────────────────────────────────
pub use crate::command::{Command, CommandKind, unix_time_us};

// ─── Channel ────────────────────────────────────────────────────────
pub use crate::channel::{ChannelError, CommandReader, CommandWriter};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_CONFIG_PATH, VELOCITY_LIMIT};
