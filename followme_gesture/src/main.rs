//! # Follow-me Gesture Recognizer
//!
//! Reads the paired accelerometer stream from the sensor serial device,
//! recognises snap gestures and publishes them on the command channel
//! until interrupted. Exit code 1 when the device or channel cannot be
//! opened.

use clap::Parser;
use followme_common::prelude::{AppConfig, CommandWriter, LogLevel, load_app_config};
use followme_gesture::error::GestureError;
use followme_gesture::runner::GestureLoop;
use followme_gesture::serial::open_serial;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Follow-me gesture recognizer: snaps in, commands out
#[derive(Parser, Debug)]
#[command(name = "followme-gesture")]
#[command(version)]
#[command(about = "Snap gesture recognition feeding the tracker command channel")]
struct Args {
    /// Path to the TOML configuration (default: config/followme.toml, optional).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serial device, overriding `[gesture] serial_port`.
    #[arg(long, value_name = "DEVICE")]
    port: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let loaded = load_app_config(args.config.as_deref());
    let level = match &loaded {
        Ok(loaded) => loaded.config.logging.level,
        Err(_) => LogLevel::Info,
    };
    setup_tracing(&args, level);

    info!("Follow-me gesture v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(GestureError::from)
        .and_then(|loaded| {
            info!("Configuration: {}", loaded.source);
            run(&args, loaded.config)
        });
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Follow-me gesture shutdown complete");
}

fn run(args: &Args, mut config: AppConfig) -> Result<(), GestureError> {
    if let Some(port) = &args.port {
        config.gesture.serial_port = port.clone();
    }

    let serial = open_serial(&config.gesture)?;
    info!(
        "Sensor link open on {} at {} baud",
        config.gesture.serial_port.display(),
        config.gesture.baud_rate
    );

    let writer = CommandWriter::new(&config.channel);
    writer.initialize()?;
    info!("Publishing commands to {}", writer.path().display());

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| GestureError::Signal(e.to_string()))?;

    let stats = GestureLoop::new(serial, &config, writer).run(&shutdown);
    if stats.publish_failures > 0 {
        error!("{} commands could not be published", stats.publish_failures);
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
