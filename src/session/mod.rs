//! # Session Logger
//!
//! Shared recording state for the serial logger.
//!
//! This module handles:
//! - The Idle / Recording / Terminated state machine driven by start, stop
//!   and quit commands
//! - Opening a fresh numbered session file on every effective start
//! - Appending timestamped records while recording
//! - One idempotent shutdown path for quit and interrupts
//!
//! The key listener thread and the serial loop each hold a clone of
//! [`SessionLogger`]; all state lives behind a single mutex.

pub mod file;
pub mod record;
pub mod recorder;

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::timestamp::format_timestamp;
use file::{next_available_path, SessionFile};
use record::{Record, Sample};

/// Operator commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Open a new session file and start recording
    Start,
    /// Close the current session file
    Stop,
    /// Close everything and end the process
    Quit,
}

/// Externally visible logger state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerState {
    Idle,
    Recording,
    Terminated,
}

/// What a command did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Idle -> Recording; a new file was created
    Started(PathBuf),
    /// Recording -> Idle; the file was closed with this many rows
    Stopped { path: PathBuf, rows: u64 },
    /// Any -> Terminated
    Terminated,
    /// Redundant command; nothing changed
    Ignored,
    /// Start failed; still Idle
    Failed(String),
}

/// What happened to one sample handed to the logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Appended to the open session file
    Written,
    /// Not recording; sample dropped
    Discarded,
    /// Append failed; the session was closed and the logger is Idle
    Failed,
}

enum SessionState {
    Idle,
    Recording(SessionFile),
    Terminated,
}

/// Thread-safe handle to the recording state
///
/// Cloning is cheap; all clones share one state.
#[derive(Clone)]
pub struct SessionLogger {
    state: Arc<Mutex<SessionState>>,
    output_dir: PathBuf,
    file_prefix: String,
}

impl std::fmt::Debug for SessionLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLogger")
            .field("state", &self.state())
            .field("output_dir", &self.output_dir)
            .field("file_prefix", &self.file_prefix)
            .finish()
    }
}

impl SessionLogger {
    /// Create an idle logger writing `<file_prefix><n>.csv` into `output_dir`
    pub fn new<P: Into<PathBuf>>(output_dir: P, file_prefix: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::Idle)),
            output_dir: output_dir.into(),
            file_prefix: file_prefix.into(),
        }
    }

    /// Create an idle logger from the `[session]` configuration section
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.output_dir, config.file_prefix.clone())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Current state
    pub fn state(&self) -> LoggerState {
        match &*self.lock() {
            SessionState::Idle => LoggerState::Idle,
            SessionState::Recording(_) => LoggerState::Recording,
            SessionState::Terminated => LoggerState::Terminated,
        }
    }

    /// Whether the serial loop should keep going
    pub fn is_running(&self) -> bool {
        self.state() != LoggerState::Terminated
    }

    /// Path of the open session file, if recording
    pub fn current_file(&self) -> Option<PathBuf> {
        match &*self.lock() {
            SessionState::Recording(file) => Some(file.path().to_path_buf()),
            _ => None,
        }
    }

    /// Apply an operator command
    ///
    /// Redundant commands (start while recording, stop while idle, anything
    /// after quit) are ignored.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sensor_logger::session::{Command, LoggerState, SessionLogger};
    ///
    /// let logger = SessionLogger::new("sensorData", "sensorData");
    /// logger.handle_command(Command::Start);
    /// assert_eq!(logger.state(), LoggerState::Recording);
    /// logger.handle_command(Command::Stop);
    /// assert_eq!(logger.state(), LoggerState::Idle);
    /// ```
    pub fn handle_command(&self, command: Command) -> Transition {
        match command {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Quit => self.shutdown(),
        }
    }

    fn start(&self) -> Transition {
        let mut state = self.lock();

        match &*state {
            SessionState::Idle => {}
            SessionState::Recording(file) => {
                debug!("Start ignored, already recording to {}", file.path().display());
                return Transition::Ignored;
            }
            SessionState::Terminated => return Transition::Ignored,
        }

        let path = next_available_path(&self.output_dir, &self.file_prefix);
        match SessionFile::create(path.clone()) {
            Ok(file) => {
                info!("Logging started: {}", path.display());
                *state = SessionState::Recording(file);
                Transition::Started(path)
            }
            Err(e) => {
                error!("Failed to create session file {}: {}", path.display(), e);
                Transition::Failed(e.to_string())
            }
        }
    }

    fn stop(&self) -> Transition {
        let mut state = self.lock();

        match std::mem::replace(&mut *state, SessionState::Idle) {
            SessionState::Recording(file) => {
                let path = file.path().to_path_buf();
                let rows = close_file(file);
                info!("Logging stopped: {} ({} rows)", path.display(), rows);
                Transition::Stopped { path, rows }
            }
            other => {
                *state = other;
                debug!("Stop ignored, not recording");
                Transition::Ignored
            }
        }
    }

    /// Close any open session and mark the logger terminated
    ///
    /// Safe to call any number of times from any thread; only the first call
    /// has an effect.
    pub fn shutdown(&self) -> Transition {
        let mut state = self.lock();

        match std::mem::replace(&mut *state, SessionState::Terminated) {
            SessionState::Terminated => Transition::Ignored,
            SessionState::Recording(file) => {
                let path = file.path().to_path_buf();
                let rows = close_file(file);
                info!("Closed {} ({} rows) on shutdown", path.display(), rows);
                Transition::Terminated
            }
            SessionState::Idle => {
                info!("Shutting down session logger");
                Transition::Terminated
            }
        }
    }

    /// Persist a sample read at `captured_at`, if recording
    ///
    /// If the append fails the session is closed and the logger returns to
    /// Idle; the operator can start a new session.
    pub fn record(&self, sample: Sample, captured_at: DateTime<Local>) -> RecordOutcome {
        let mut state = self.lock();

        let file = match &mut *state {
            SessionState::Recording(file) => file,
            _ => return RecordOutcome::Discarded,
        };

        let record = Record::new(format_timestamp(&captured_at), sample);
        match file.append(&record) {
            Ok(()) => RecordOutcome::Written,
            Err(e) => {
                error!("Failed to append to {}: {}", file.path().display(), e);
                if let SessionState::Recording(file) = std::mem::replace(&mut *state, SessionState::Idle) {
                    close_file(file);
                }
                warn!("Logging stopped after write failure");
                RecordOutcome::Failed
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn close_file(file: SessionFile) -> u64 {
    let path = file.path().to_path_buf();
    let rows = file.rows();
    if let Err(e) = file.close() {
        warn!("Failed to flush {} on close: {}", path.display(), e);
    }
    rows
}
