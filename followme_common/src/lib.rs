//! Follow-me common library
//!
//! Shared by the tracking and gesture processes. The two processes never
//! share memory; everything they agree on lives here.
//!
//! # Module Structure
//!
//! - [`config`] - TOML configuration for both processes
//! - [`command`] - Discrete gesture commands
//! - [`channel`] - Atomic file-based command channel
//! - [`consts`] - Workspace-wide constants
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use followme_common::prelude::*;
//! ```

pub mod channel;
pub mod command;
pub mod config;
pub mod consts;
pub mod prelude;
