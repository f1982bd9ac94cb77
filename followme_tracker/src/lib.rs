//! # Follow-me Tracker Library
//!
//! Keeps a detected subject centred in the camera image of a small aircraft
//! and holds a stable following distance, while reacting to gesture commands
//! published by the gesture process.
//!
//! ## Layers
//!
//! 1. **platform**: `FlightPlatform` trait, driver registry, simulation driver
//! 2. **detector**: frame → optional `SubjectObservation`
//! 3. **control**: PID axes and the `TrackingController` state machine
//! 4. **safety**: altitude envelope and bounded landing
//! 5. **command**: gesture command dispatch and the circle maneuver
//! 6. **cycle**: the fixed-period `TrackingLoop` tying it together

pub mod command;
pub mod control;
pub mod cycle;
pub mod detector;
pub mod error;
pub mod platform;
pub mod safety;
pub mod state;
