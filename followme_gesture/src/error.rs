//! Gesture process error types.

use crate::serial::SerialError;
use followme_common::channel::ChannelError;
use followme_common::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GestureError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Serial(#[from] SerialError),

    #[error("Command channel unavailable: {0}")]
    Channel(#[from] ChannelError),

    #[error("Signal handler setup failed: {0}")]
    Signal(String),
}
