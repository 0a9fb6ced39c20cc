//! # Diagnostic Logging
//!
//! `tracing` subscriber setup shared by all binaries: human-readable output
//! on stderr, plus an optional daily-rolling file in `[logging].log_dir`.
//!
//! `RUST_LOG` overrides the configured level.
//!
//! While the terminal is in raw mode a bare `\n` only moves the cursor
//! down, so stderr output is written with `\r\n` line endings until raw
//! mode ends (see [`set_raw_terminal`]).

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

static RAW_TERMINAL: AtomicBool = AtomicBool::new(false);

/// Record whether the terminal is in raw mode
pub fn set_raw_terminal(raw: bool) {
    RAW_TERMINAL.store(raw, Ordering::SeqCst);
}

pub fn raw_terminal() -> bool {
    RAW_TERMINAL.load(Ordering::SeqCst)
}

/// Terminal writer that ends lines with `\r\n` when `raw` is set
#[derive(Debug)]
pub struct TerminalWriter<W> {
    inner: W,
    raw: bool,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(inner: W, raw: bool) -> Self {
        Self { inner, raw }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl TerminalWriter<io::Stderr> {
    /// Stderr, following the current raw mode
    pub fn stderr() -> Self {
        Self::new(io::stderr(), raw_terminal())
    }
}

impl<W: Write> Write for TerminalWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.raw {
            return self.inner.write(buf);
        }

        for line in buf.split_inclusive(|&b| b == b'\n') {
            match line.strip_suffix(b"\n") {
                Some(text) => {
                    self.inner.write_all(text.strip_suffix(b"\r").unwrap_or(text))?;
                    self.inner.write_all(b"\r\n")?;
                }
                None => self.inner.write_all(line)?,
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Build the level filter: `RUST_LOG` if set and valid, else the configured level
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber
///
/// `file_name` is the base name of the rolling log file (the date is
/// appended). Keep the returned guard alive until exit so buffered file
/// output is written.
pub fn init(config: &LoggingConfig, file_name: &str) -> Option<WorkerGuard> {
    let (file_layer, guard) = if config.log_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.log_dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        (Some(layer), Some(guard))
    };

    let result = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt::layer().with_writer(TerminalWriter::stderr))
        .with(file_layer)
        .try_init();

    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }

    guard
}
