//! Paired accelerometer readings over a byte stream.
//!
//! The sensor microcontroller prints one line per sample: two integer
//! magnitudes separated by a comma, e.g. `"51234, 2210\n"`; extra trailing
//! values are ignored. Reads may split or merge lines arbitrarily, so bytes
//! are assembled into lines first.
//! Malformed and oversize lines are dropped.

use std::io::{self, Read};
use tracing::debug;

/// Longest accepted line, terminator excluded.
pub const MAX_LINE_LEN: usize = 128;

/// One sample from the two sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorReading {
    pub first: i64,
    pub second: i64,
}

impl SensorReading {
    pub const fn new(first: i64, second: i64) -> Self {
        Self { first, second }
    }

    /// Parse `"<int>, <int>[, <int>...]"`, keeping the first two values.
    ///
    /// Every field must be an integer. Surrounding whitespace is ignored.
    pub fn parse(line: &str) -> Option<Self> {
        let values = line
            .trim()
            .split(',')
            .map(|field| field.trim().parse::<i64>().ok())
            .collect::<Option<Vec<_>>>()?;
        match values.as_slice() {
            [first, second, ..] => Some(Self::new(*first, *second)),
            _ => None,
        }
    }
}

// ─── Line Assembly ──────────────────────────────────────────────────

/// Reassembles newline-terminated lines from arbitrary chunks.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: Vec<u8>,
    /// Current line exceeded `MAX_LINE_LEN`; skip until the next newline.
    discarding: bool,
    dropped: u64,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes; complete lines are appended to `lines`.
    pub fn push(&mut self, bytes: &[u8], lines: &mut Vec<String>) {
        for &byte in bytes {
            if byte == b'\n' {
                if self.discarding {
                    self.discarding = false;
                } else {
                    let line = String::from_utf8_lossy(&self.buffer);
                    lines.push(line.trim_end_matches('\r').to_string());
                }
                self.buffer.clear();
                continue;
            }
            if self.discarding {
                continue;
            }
            if self.buffer.len() >= MAX_LINE_LEN {
                self.buffer.clear();
                self.discarding = true;
                self.dropped += 1;
                continue;
            }
            self.buffer.push(byte);
        }
    }

    /// Oversize lines dropped so far.
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }
}

// ─── Link ───────────────────────────────────────────────────────────

/// Turns a byte source into sensor readings.
pub struct SensorLink<R> {
    reader: R,
    assembler: LineAssembler,
    malformed: u64,
}

impl<R: Read> SensorLink<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            assembler: LineAssembler::new(),
            malformed: 0,
        }
    }

    /// One read from the source; returns whatever complete readings it yielded.
    ///
    /// A timeout (zero-byte read, `WouldBlock`, `TimedOut`, `Interrupted`)
    /// yields no readings rather than an error.
    pub fn poll(&mut self) -> io::Result<Vec<SensorReading>> {
        let mut chunk = [0u8; 256];
        let n = match self.reader.read(&mut chunk) {
            Ok(n) => n,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                0
            }
            Err(e) => return Err(e),
        };

        let mut lines = Vec::new();
        self.assembler.push(&chunk[..n], &mut lines);

        let mut readings = Vec::with_capacity(lines.len());
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            match SensorReading::parse(&line) {
                Some(reading) => readings.push(reading),
                None => {
                    self.malformed += 1;
                    debug!("Discarding malformed sensor line {line:?}");
                }
            }
        }
        Ok(readings)
    }

    /// Lines that could not be parsed, plus oversize lines.
    pub const fn discarded(&self) -> u64 {
        self.malformed + self.assembler.dropped()
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }
}
