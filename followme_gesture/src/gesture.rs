//! Gesture window state machine.
//!
//! ```text
//!            snap                      window expired
//!   Idle ───────────▶ Counting ───────────────────────▶ Idle
//!                      │   ▲                  (emit count → command)
//!                      └───┘ snap inside window
//!                            (debounced by min_gap)
//! ```
//!
//! The window is fixed from the first snap; later snaps do not extend it.
//! On expiry the count is mapped with [`CommandKind::from_snap_count`].

use crate::snap::SnapEvent;
use followme_common::command::CommandKind;
use followme_common::config::GestureConfig;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Counting,
}

/// Open gesture window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureWindow {
    pub count: u32,
    pub started_at: Instant,
    pub last_event_at: Instant,
}

#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    window: Duration,
    min_gap: Duration,
    open: Option<GestureWindow>,
}

impl GestureRecognizer {
    pub fn new(window: Duration, min_gap: Duration) -> Self {
        Self {
            window,
            min_gap,
            open: None,
        }
    }

    pub fn from_config(config: &GestureConfig) -> Self {
        Self::new(config.window(), config.min_gap())
    }

    pub fn state(&self) -> GestureState {
        match self.open {
            Some(_) => GestureState::Counting,
            None => GestureState::Idle,
        }
    }

    pub fn window(&self) -> Option<&GestureWindow> {
        self.open.as_ref()
    }

    /// Register a snap.
    ///
    /// If the open window expired before this snap, it is closed first and
    /// its command returned; the snap then opens a new window.
    pub fn on_event(&mut self, event: &SnapEvent) -> Option<CommandKind> {
        let closed = self.poll(event.at);

        match self.open.as_mut() {
            None => {
                debug!("Gesture window opened");
                self.open = Some(GestureWindow {
                    count: 1,
                    started_at: event.at,
                    last_event_at: event.at,
                });
            }
            Some(window) => {
                let gap = event.at.saturating_duration_since(window.last_event_at);
                if gap < self.min_gap {
                    debug!("Snap debounced ({} ms after previous)", gap.as_millis());
                } else {
                    window.count += 1;
                    window.last_event_at = event.at;
                    debug!("Snap {} in window", window.count);
                }
            }
        }

        closed
    }

    /// Close the window if it has expired at `now`.
    ///
    /// Returns the mapped command; counts outside the mapping emit nothing.
    pub fn poll(&mut self, now: Instant) -> Option<CommandKind> {
        let window = self.open?;
        if now.saturating_duration_since(window.started_at) < self.window {
            return None;
        }
        self.open = None;

        let command = CommandKind::from_snap_count(window.count);
        match command {
            Some(kind) => info!("Gesture complete: {} snap(s) → {kind}", window.count),
            None => info!("Gesture discarded: {} snaps", window.count),
        }
        command
    }
}
