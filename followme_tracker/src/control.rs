//! Control engine root.
//!
//! Two independent PID axes (yaw and vertical) plus the rule-based forward
//! and search behaviour, combined by the tracking controller.

pub mod pid;
pub mod tracking;
