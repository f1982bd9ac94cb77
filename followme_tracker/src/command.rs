//! Gesture command handling root.
//!
//! Commands read from the channel are dispatched between control ticks; the
//! circle maneuver temporarily takes over the platform.

pub mod circle;
pub mod dispatch;
