//! # Follow-me Gesture Library
//!
//! Turns the paired accelerometer stream from the sensor microcontroller
//! into discrete commands for the tracker.
//!
//! ## Pipeline
//!
//! 1. **serial**: raw termios setup of the sensor device
//! 2. **sensor**: byte stream → `SensorReading` pairs
//! 3. **snap**: reading pairs → `SnapEvent`s
//! 4. **gesture**: snap windows → `CommandKind`
//! 5. **runner**: the loop publishing commands to the channel

pub mod error;
pub mod gesture;
pub mod runner;
pub mod sensor;
pub mod serial;
pub mod snap;
