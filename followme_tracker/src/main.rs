//! # Follow-me Tracker
//!
//! Connects to the configured flight platform, takes off and runs the
//! tracking loop until interrupted, then lands. Exit code 1 on any startup
//! failure.

use clap::Parser;
use followme_common::prelude::{AppConfig, LogLevel, load_app_config};
use followme_tracker::cycle::TrackingLoop;
use followme_tracker::detector::BrightRegionDetector;
use followme_tracker::error::TrackerError;
use followme_tracker::platform::registry::PlatformRegistry;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Follow-me tracker: keeps the subject centred and follows at a fixed distance
#[derive(Parser, Debug)]
#[command(name = "followme-tracker")]
#[command(version)]
#[command(about = "Subject-following flight control loop")]
struct Args {
    /// Path to the TOML configuration (default: config/followme.toml, optional).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Platform driver, overriding `[platform] driver`.
    #[arg(long, value_name = "NAME")]
    driver: Option<String>,

    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // Tracing depends on the configured level, so load first and report after.
    let loaded = load_app_config(args.config.as_deref());
    let level = match &loaded {
        Ok(loaded) => loaded.config.logging.level,
        Err(_) => LogLevel::Info,
    };
    setup_tracing(&args, level);

    info!("Follow-me tracker v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(TrackerError::from)
        .and_then(|loaded| {
            info!("Configuration: {}", loaded.source);
            run(&args, loaded.config)
        });
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Follow-me tracker shutdown complete");
}

fn run(args: &Args, mut config: AppConfig) -> Result<(), TrackerError> {
    if let Some(driver) = &args.driver {
        config.platform.driver = driver.clone();
    }

    let registry = PlatformRegistry::with_builtin();
    let platform = registry
        .create(&config.platform.driver, &config)
        .inspect_err(|_| info!("Available drivers: {}", registry.list().join(", ")))?;
    let detector = BrightRegionDetector::from_config(&config.detector);

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| TrackerError::Signal(e.to_string()))?;

    let mut tracking = TrackingLoop::new(&config, platform, Box::new(detector), shutdown)?;
    tracking.start()?;

    let exit = tracking.run();
    if !exit.landing.is_landed() {
        warn!("Exiting without confirmed landing: {:?}", exit.landing);
    }
    Ok(())
}

fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.debug {
        LogLevel::Debug.as_directive()
    } else {
        level.as_directive()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
