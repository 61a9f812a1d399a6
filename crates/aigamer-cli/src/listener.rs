//! # Key Listener
//!
//! Runtime controls read from the terminal on a dedicated thread while the
//! game loop runs on tokio. The terminal stays in raw mode for the listener's
//! lifetime so single key presses arrive without Enter.

use aigamer_core::{Console, ControlKey, LoopControl, SessionLog};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Translate a key press into a loop control.
pub fn control_for(key: &KeyEvent) -> Option<ControlKey> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(ControlKey::Stop),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Esc => Some(ControlKey::Stop),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'p' => Some(ControlKey::TogglePause),
            's' => Some(ControlKey::ToggleStep),
            'n' => Some(ControlKey::Next),
            '+' | '=' => Some(ControlKey::Faster),
            '-' | '_' => Some(ControlKey::Slower),
            'r' => Some(ControlKey::Reset),
            'h' => Some(ControlKey::Help),
            _ => None,
        },
        _ => None,
    }
}

/// Background thread that feeds key presses into [`LoopControl`].
///
/// Dropping the listener stops it and restores the terminal.
pub struct KeyListener {
    control: LoopControl,
    handle: Option<JoinHandle<()>>,
}

impl KeyListener {
    pub fn spawn(
        control: LoopControl,
        console: Console,
        log: Option<SessionLog>,
    ) -> io::Result<Self> {
        enable_raw_mode()?;

        let thread_control = control.clone();
        let handle = thread::Builder::new()
            .name("key-listener".to_string())
            .spawn(move || listen(thread_control, console, log));

        match handle {
            Ok(handle) => Ok(Self {
                control,
                handle: Some(handle),
            }),
            Err(e) => {
                let _ = disable_raw_mode();
                Err(e)
            }
        }
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        self.control.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Key listener thread panicked");
            }
        }
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

fn listen(control: LoopControl, console: Console, log: Option<SessionLog>) {
    debug!("Key listener started");

    while !control.is_stopped() {
        match event::poll(POLL_INTERVAL) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                warn!("Error polling keyboard: {}", e);
                thread::sleep(POLL_INTERVAL);
                continue;
            }
        }

        // Released before `apply`, which may log through the console.
        let read = {
            let _guard = console.lock();
            event::read()
        };

        let key = match read {
            Ok(Event::Key(key)) => key,
            Ok(_) => continue,
            Err(e) => {
                warn!("Error reading keyboard: {}", e);
                continue;
            }
        };

        let Some(control_key) = control_for(&key) else {
            continue;
        };

        if let Some(notice) = control.apply(control_key) {
            console.line(&notice.message);
            if let (Some(log), Some(event)) = (&log, &notice.event) {
                log.log_system_event(event);
            }
        }
    }

    debug!("Key listener stopped");
}
