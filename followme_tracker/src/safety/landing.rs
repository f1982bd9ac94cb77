//! Bounded landing.
//!
//! `land()` may block on a dead link. The platform is moved onto a helper
//! thread and the caller waits at most `timeout` for the outcome; on timeout
//! the thread is left detached and the process is free to exit.

use crate::platform::{FlightPlatform, PlatformError};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub enum LandingOutcome {
    Landed,
    Failed(PlatformError),
    TimedOut,
}

impl LandingOutcome {
    #[inline]
    pub const fn is_landed(&self) -> bool {
        matches!(self, Self::Landed)
    }
}

/// Land and release the platform, waiting no longer than `timeout`.
pub fn land_with_timeout(platform: Box<dyn FlightPlatform>, timeout: Duration) -> LandingOutcome {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("followme-land".into())
        .spawn(move || {
            let mut platform = platform;
            let result = platform.land();
            if let Err(e) = platform.shutdown() {
                warn!("Platform shutdown failed: {e}");
            }
            // Receiver may be gone after a timeout.
            let _ = tx.send(result);
        });

    if let Err(e) = spawned {
        error!("Cannot spawn landing thread: {e}");
        return LandingOutcome::Failed(PlatformError::Connection(e.to_string()));
    }

    match rx.recv_timeout(timeout) {
        Ok(Ok(())) => {
            info!("Landed");
            LandingOutcome::Landed
        }
        Ok(Err(e)) => {
            error!("Landing failed: {e}");
            LandingOutcome::Failed(e)
        }
        Err(_) => {
            error!("Landing did not complete within {} ms", timeout.as_millis());
            LandingOutcome::TimedOut
        }
    }
}
