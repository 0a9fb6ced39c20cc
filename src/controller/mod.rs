//! # Controller Module
//!
//! Gamepad event logging.
//!
//! This module handles:
//! - Finding gamepads via evdev, including ones plugged in while logging
//! - Describing button and axis events, with axis rate limiting
//! - Writing timestamped events to numbered CSV logs
//!
//! A watcher thread rescans `/dev/input` and starts one blocking reader
//! thread per gamepad; readers forward described events over a channel and
//! the async side writes them until the process is interrupted.

pub mod device;
pub mod event_log;
pub mod events;
pub mod watcher;

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::GamepadConfig;
use crate::error::Result;
use crate::timestamp::now_timestamp;
use device::{InputDir, INPUT_DIR};
use event_log::EventLog;
use watcher::{spawn_watcher, DeviceWatcher};

/// First row of every gamepad log, written before any device is seen
pub const PLUG_IN_HINT: &str = "Please plug in a joystick.";

/// Joystick id of rows that belong to no device
pub const NO_JOYSTICK: u32 = 0;

/// One described event, stamped when it was read from the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedEvent {
    pub timestamp: String,
    pub joystick_id: u32,
    pub description: String,
}

impl LoggedEvent {
    pub fn now(joystick_id: u32, description: String) -> Self {
        Self {
            timestamp: now_timestamp(),
            joystick_id,
            description,
        }
    }
}

/// Write the plug-in hint row that opens every log
pub fn write_plug_in_hint(log: &mut EventLog) -> Result<()> {
    log.append(&now_timestamp(), NO_JOYSTICK, PLUG_IN_HINT)
}

/// Write events from `rx` to `log` until the channel closes or `shutdown` resolves
///
/// Returns the number of rows written.
pub async fn write_events<F>(
    rx: &mut mpsc::UnboundedReceiver<LoggedEvent>,
    log: &mut EventLog,
    shutdown: F,
) -> Result<u64>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let start = log.rows();

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => log.append(&event.timestamp, event.joystick_id, &event.description)?,
                None => {
                    info!("Gamepad readers finished");
                    break;
                }
            },
            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    Ok(log.rows() - start)
}

/// Log events of every gamepad that comes and goes until Ctrl+C
///
/// Starts with no gamepad connected; the log opens with the plug-in hint
/// and devices are picked up by rescanning `/dev/input`.
pub async fn run(config: &GamepadConfig) -> Result<u64> {
    let mut log = EventLog::create_next(&config.log_dir, &config.file_prefix)?;
    write_plug_in_hint(&mut log)?;
    info!("{}", PLUG_IN_HINT);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let source = InputDir::new(INPUT_DIR, &config.device_path);
    let watcher = DeviceWatcher::new(source, Duration::from_millis(config.motion_cooldown_ms), tx);
    spawn_watcher(watcher, Duration::from_millis(config.rescan_interval_ms))?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let written = write_events(&mut rx, &mut log, shutdown).await?;

    let path = log.path().to_path_buf();
    let rows = log.close()?;
    info!("Closed {} ({} rows)", path.display(), rows);
    Ok(written)
}
