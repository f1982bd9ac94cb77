//! Tracker error types.
//!
//! Only startup can fail the process. Once the loop runs, platform errors
//! skip the current tick and shutdown always proceeds to landing.

use crate::control::pid::PidError;
use crate::platform::PlatformError;
use followme_common::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Controller setup failed: {0}")]
    Controller(#[from] PidError),

    #[error("Platform startup failed: {0}")]
    Platform(#[from] PlatformError),

    #[error("Signal handler setup failed: {0}")]
    Signal(String),
}
