//! Serial port setup.
//!
//! Opens the sensor device raw (no echo, no line discipline) at the
//! configured baud rate, with reads bounded by the configured timeout via
//! `VMIN = 0, VTIME = timeout`: a read returns as soon as any byte arrives,
//! or with zero bytes once the timeout expires.

use followme_common::config::GestureConfig;
use nix::fcntl::OFlag;
use nix::sys::termios::{
    self, BaudRate, ControlFlags, FlushArg, SetArg, SpecialCharacterIndices,
};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerialError {
    #[error("Cannot open serial device {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported baud rate {0}")]
    UnsupportedBaud(u32),

    #[error("Serial configuration failed on {}: {source}", path.display())]
    Configure {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },
}

/// Map a numeric baud rate onto the termios constant.
pub fn baud_rate(rate: u32) -> Result<BaudRate, SerialError> {
    Ok(match rate {
        1200 => BaudRate::B1200,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19_200 => BaudRate::B19200,
        38_400 => BaudRate::B38400,
        57_600 => BaudRate::B57600,
        115_200 => BaudRate::B115200,
        230_400 => BaudRate::B230400,
        other => return Err(SerialError::UnsupportedBaud(other)),
    })
}

/// `VTIME` in deciseconds: at least 1, at most 255.
pub fn vtime_deciseconds(timeout: Duration) -> u8 {
    let ds = timeout.as_millis().div_ceil(100);
    ds.clamp(1, u128::from(u8::MAX)) as u8
}

/// Open and configure the sensor port described by `config`.
///
/// The returned `File` closes the device when dropped.
pub fn open_serial(config: &GestureConfig) -> Result<File, SerialError> {
    open_port(&config.serial_port, config.baud_rate, config.read_timeout())
}

pub fn open_port(path: &Path, rate: u32, timeout: Duration) -> Result<File, SerialError> {
    let baud = baud_rate(rate)?;
    let configure_err = |source| SerialError::Configure {
        path: path.to_path_buf(),
        source,
    };

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(OFlag::O_NOCTTY.bits())
        .open(path)
        .map_err(|source| SerialError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let mut tty = termios::tcgetattr(&file).map_err(configure_err)?;
    termios::cfmakeraw(&mut tty);
    termios::cfsetspeed(&mut tty, baud).map_err(configure_err)?;
    tty.control_flags |= ControlFlags::CLOCAL | ControlFlags::CREAD;
    tty.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
    tty.control_chars[SpecialCharacterIndices::VTIME as usize] = vtime_deciseconds(timeout);
    termios::tcsetattr(&file, SetArg::TCSANOW, &tty).map_err(configure_err)?;

    // Drop whatever accumulated before we were listening.
    termios::tcflush(&file, FlushArg::TCIFLUSH).map_err(configure_err)?;
    Ok(file)
}
