//! # Keyboard Command Listener
//!
//! Background thread that turns key presses into session commands.
//!
//! | Key | Command |
//! |-----|---------|
//! | `s` | Start a new session |
//! | `e` | Stop the current session |
//! | `q` | Quit |
//! | Ctrl+C | Quit (raw mode swallows SIGINT) |
//!
//! Any other key is ignored.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

use crate::logging;
use crate::session::{Command, SessionLogger};

/// Map a key event to a session command
///
/// # Examples
///
/// ```
/// use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
/// use sensor_logger::keyboard::command_for_key;
/// use sensor_logger::session::Command;
///
/// let key = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE);
/// assert_eq!(command_for_key(&key), Some(Command::Start));
/// ```
pub fn command_for_key(key: &KeyEvent) -> Option<Command> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        _ if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => None,
        KeyCode::Char('s') => Some(Command::Start),
        KeyCode::Char('e') => Some(Command::Stop),
        KeyCode::Char('q') => Some(Command::Quit),
        _ => None,
    }
}

/// Keeps the terminal in raw mode for as long as it lives
///
/// Raw mode delivers single key presses without Enter. If the terminal
/// cannot be switched (not a TTY) the guard is inert.
pub struct RawModeGuard {
    enabled: bool,
}

impl RawModeGuard {
    pub fn enable() -> Self {
        match terminal::enable_raw_mode() {
            Ok(()) => {
                logging::set_raw_terminal(true);
                Self { enabled: true }
            }
            Err(e) => {
                warn!("Could not enable raw terminal mode, keys need Enter: {}", e);
                Self { enabled: false }
            }
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.enabled {
            if let Err(e) = terminal::disable_raw_mode() {
                warn!("Failed to restore terminal mode: {}", e);
            }
            logging::set_raw_terminal(false);
        }
    }
}

/// Spawn the key listener thread
///
/// The thread applies commands to `logger` as keys arrive and exits after a
/// quit, or within `poll_interval` of the logger being shut down elsewhere.
pub fn spawn_listener(logger: SessionLogger, poll_interval: Duration) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("key-listener".to_string())
        .spawn(move || listen(&logger, poll_interval))
}

fn listen(logger: &SessionLogger, poll_interval: Duration) {
    while logger.is_running() {
        let ready = match event::poll(poll_interval) {
            Ok(ready) => ready,
            Err(e) => {
                warn!("Key listener stopped, terminal unavailable: {}", e);
                return;
            }
        };
        if !ready {
            continue;
        }

        match event::read() {
            Ok(Event::Key(key)) => {
                if let Some(command) = command_for_key(&key) {
                    let transition = logger.handle_command(command);
                    debug!("Key {:?} -> {:?}: {:?}", key.code, command, transition);
                    if command == Command::Quit {
                        return;
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Key listener stopped, failed to read event: {}", e);
                return;
            }
        }
    }
}
