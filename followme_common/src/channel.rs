//! File-based command channel between the gesture and tracking processes.
//!
//! One writer, one reader, one file, no locks. The writer rewrites the
//! whole queue into a temporary file in the destination directory and then
//! renames it over the destination, so a reader always sees one complete
//! queue state. The reader keeps its "last consumed" marker in memory only;
//! the shared file is never written by the reader.
//!
//! Read failures of any kind (missing file, I/O error, malformed JSON,
//! unknown format version) surface to the consumer as "no new commands".

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandKind, unix_time_us};
use crate::config::ChannelConfig;
use crate::consts::CHANNEL_FORMAT_VERSION;

/// Errors of the producer side and of raw queue loading.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Filesystem error
    #[error("Channel I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Malformed queue contents
    #[error("Channel JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Queue written by an incompatible format version
    #[error("Unsupported channel format version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
}

/// Persisted queue of outstanding commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandQueue {
    /// Format version (for migration).
    pub version: u32,
    /// Creation stamp of this queue [µs]; changes whenever the queue is recreated.
    pub generation: u64,
    /// Highest sequence number ever assigned in this generation.
    pub last_sequence: u64,
    /// Retained commands in ascending sequence order.
    pub commands: Vec<Command>,
}

impl CommandQueue {
    /// Empty queue with a fresh generation stamp.
    pub fn new() -> Self {
        Self {
            version: CHANNEL_FORMAT_VERSION,
            generation: unix_time_us(),
            last_sequence: 0,
            commands: Vec::new(),
        }
    }

    /// Append a command with the next sequence number, keeping at most
    /// `retain` entries.
    pub fn append(&mut self, kind: CommandKind, created_at: u64, retain: usize) -> Command {
        self.last_sequence += 1;
        let command = Command::new(self.last_sequence, kind, created_at);
        self.commands.push(command);

        if self.commands.len() > retain {
            let excess = self.commands.len() - retain;
            self.commands.drain(..excess);
        }
        command
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Load the persisted queue.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn load_queue(path: &Path) -> Result<Option<CommandQueue>, ChannelError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let queue: CommandQueue = serde_json::from_slice(&bytes)?;
    if queue.version != CHANNEL_FORMAT_VERSION {
        return Err(ChannelError::Version {
            found: queue.version,
            expected: CHANNEL_FORMAT_VERSION,
        });
    }
    Ok(Some(queue))
}

/// Final step of an atomic write: move the finished temporary file over the
/// destination.
///
/// Implementations must either fully replace `to` or leave it untouched.
pub trait FileReplacer: Send + Sync {
    fn replace(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// `rename(2)`-based replacement (atomic within one filesystem).
#[derive(Debug, Clone, Copy, Default)]
pub struct RenameReplacer;

impl FileReplacer for RenameReplacer {
    fn replace(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}

// ─── Producer ───────────────────────────────────────────────────────

/// Producer side, owned by the gesture process.
pub struct CommandWriter {
    path: PathBuf,
    retain: usize,
    replacer: Box<dyn FileReplacer>,
}

impl CommandWriter {
    pub fn new(config: &ChannelConfig) -> Self {
        Self {
            path: config.path.clone(),
            retain: config.retain.max(1),
            replacer: Box::new(RenameReplacer),
        }
    }

    /// Swap the final replacement step (used for fault injection).
    pub fn with_replacer(mut self, replacer: Box<dyn FileReplacer>) -> Self {
        self.replacer = replacer;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the channel directory and an empty queue if no readable queue
    /// exists yet. An existing valid queue is left as is so a running reader
    /// keeps its position.
    pub fn initialize(&self) -> Result<(), ChannelError> {
        fs::create_dir_all(self.dir())?;

        match load_queue(&self.path) {
            Ok(Some(queue)) => {
                info!(
                    "Command channel at {} holds {} commands (last sequence {})",
                    self.path.display(),
                    queue.commands.len(),
                    queue.last_sequence
                );
                Ok(())
            }
            Ok(None) => {
                self.write_atomic(&CommandQueue::new())?;
                info!("Initialized empty command channel at {}", self.path.display());
                Ok(())
            }
            Err(e) => {
                warn!("Command channel unreadable ({e}), recreating");
                self.write_atomic(&CommandQueue::new())
            }
        }
    }

    /// Append one command and atomically persist the whole queue.
    pub fn publish(&self, kind: CommandKind) -> Result<Command, ChannelError> {
        let mut queue = match load_queue(&self.path) {
            Ok(Some(queue)) => queue,
            Ok(None) => CommandQueue::new(),
            Err(e) => {
                warn!("Command channel unreadable ({e}), starting a new queue");
                CommandQueue::new()
            }
        };

        let command = queue.append(kind, unix_time_us(), self.retain);
        self.write_atomic(&queue)?;
        debug!(
            "Published {} as #{} ({} retained)",
            command.kind,
            command.sequence_number,
            queue.commands.len()
        );
        Ok(command)
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn write_atomic(&self, queue: &CommandQueue) -> Result<(), ChannelError> {
        let dir = self.dir();
        let bytes = serde_json::to_vec_pretty(queue)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;

        // Dropping the TempPath on a failed replace removes the temp file.
        let tmp_path = tmp.into_temp_path();
        self.replacer.replace(&tmp_path, &self.path)?;
        let _ = tmp_path.keep();

        if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
            debug!("Directory sync of {} failed: {e}", dir.display());
        }
        Ok(())
    }
}

// ─── Consumer ───────────────────────────────────────────────────────

/// Consumer side, owned by the tracking process.
#[derive(Debug)]
pub struct CommandReader {
    path: PathBuf,
    last_consumed: u64,
    generation: Option<u64>,
    degraded: bool,
}

impl CommandReader {
    pub fn new(config: &ChannelConfig) -> Self {
        Self::at_path(&config.path)
    }

    pub fn at_path(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            last_consumed: 0,
            generation: None,
            degraded: false,
        }
    }

    /// Sequence number of the newest command handed out so far.
    pub fn last_consumed(&self) -> u64 {
        self.last_consumed
    }

    /// Commands added since the previous call, in sequence order.
    ///
    /// Never fails: an unreadable queue yields an empty batch.
    pub fn read_new(&mut self) -> Vec<Command> {
        let queue = match load_queue(&self.path) {
            Ok(Some(queue)) => queue,
            Ok(None) => return Vec::new(),
            Err(e) => {
                if !self.degraded {
                    warn!("Ignoring unreadable command channel {}: {e}", self.path.display());
                    self.degraded = true;
                }
                return Vec::new();
            }
        };
        if self.degraded {
            info!("Command channel readable again");
            self.degraded = false;
        }

        if self.generation != Some(queue.generation) {
            if self.generation.is_some() {
                info!(
                    "Command queue recreated (generation {}), resetting marker from #{}",
                    queue.generation, self.last_consumed
                );
                self.last_consumed = 0;
            }
            self.generation = Some(queue.generation);
        }

        let mut fresh: Vec<Command> = queue
            .commands
            .into_iter()
            .filter(|c| c.sequence_number > self.last_consumed)
            .collect();
        fresh.sort_by_key(|c| c.sequence_number);

        if let Some(newest) = fresh.last() {
            self.last_consumed = newest.sequence_number;
        }
        fresh
    }
}
