//! Keyboard input delivery to the game window.
//!
//! This module provides:
//! - `InputDriver`, the low-level seam (focus, key down, key up)
//! - `InputDispatcher`, which focuses before every operation and applies the
//!   key hold/settle timing
//! - An enigo-backed driver and a recording mock driver

use crate::capture::GameWindow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Errors that can occur during input simulation.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to simulate input: {0}")]
    SimulationFailed(String),

    #[error("Failed to focus game window: {0}")]
    FocusFailed(String),
}

/// Result type for input operations.
pub type InputResult<T> = Result<T, InputError>;

/// Arrow key directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArrowDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ArrowDirection {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }

    /// Parse a canonical direction name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_uppercase().as_str() {
            "UP" => Some(Self::Up),
            "DOWN" => Some(Self::Down),
            "LEFT" => Some(Self::Left),
            "RIGHT" => Some(Self::Right),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArrowDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single key the game understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// A printable character
    Char(char),
    Enter,
    Arrow(ArrowDirection),
}

/// Hold and settle timing for a key tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTiming {
    /// Time between key down and key up
    pub hold: Duration,
    /// Pause after key up before the next key
    pub settle: Duration,
}

impl Default for KeyTiming {
    fn default() -> Self {
        Self {
            hold: Duration::from_millis(30),
            settle: Duration::from_millis(50),
        }
    }
}

impl KeyTiming {
    /// No delays; for tests.
    pub fn instant() -> Self {
        Self {
            hold: Duration::ZERO,
            settle: Duration::ZERO,
        }
    }
}

/// Low-level keyboard synthesis and window focus.
#[async_trait]
pub trait InputDriver: Send + Sync {
    /// Check if input simulation is available on this platform.
    fn is_available(&self) -> bool;

    /// Bring `window` to the foreground. Returns whether it worked.
    async fn focus(&self, window: &GameWindow) -> bool;

    async fn key_down(&self, key: KeyInput) -> InputResult<()>;

    async fn key_up(&self, key: KeyInput) -> InputResult<()>;
}

/// Delivers keys to one game window, focusing it before every operation.
pub struct InputDispatcher {
    driver: Box<dyn InputDriver>,
    window: GameWindow,
    timing: KeyTiming,
}

impl InputDispatcher {
    pub fn new(driver: Box<dyn InputDriver>, window: GameWindow) -> Self {
        Self {
            driver,
            window,
            timing: KeyTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: KeyTiming) -> Self {
        self.timing = timing;
        self
    }

    /// The window keys are delivered to.
    pub fn window(&self) -> &GameWindow {
        &self.window
    }

    /// Bring the game window to the foreground.
    pub async fn focus(&self) -> bool {
        self.driver.focus(&self.window).await
    }

    /// Tap one character key.
    pub async fn send_key(&self, c: char) -> InputResult<()> {
        self.ensure_focus().await?;
        self.tap(KeyInput::Char(c)).await
    }

    /// Tap each character of `text` in order.
    pub async fn send_text(&self, text: &str) -> InputResult<()> {
        for c in text.chars() {
            self.send_key(c).await?;
        }
        Ok(())
    }

    pub async fn send_enter(&self) -> InputResult<()> {
        self.ensure_focus().await?;
        self.tap(KeyInput::Enter).await
    }

    pub async fn send_arrow(&self, direction: ArrowDirection) -> InputResult<()> {
        self.ensure_focus().await?;
        self.tap(KeyInput::Arrow(direction)).await
    }

    async fn ensure_focus(&self) -> InputResult<()> {
        if self.focus().await {
            Ok(())
        } else {
            warn!("Failed to focus game window '{}'", self.window.title);
            Err(InputError::FocusFailed(self.window.title.clone()))
        }
    }

    async fn tap(&self, key: KeyInput) -> InputResult<()> {
        debug!("Tap {:?}", key);
        self.driver.key_down(key).await?;
        tokio::time::sleep(self.timing.hold).await;
        self.driver.key_up(key).await?;
        tokio::time::sleep(self.timing.settle).await;
        Ok(())
    }
}

/// Platform-specific input simulation using enigo.
#[cfg(feature = "gui-automation")]
pub mod platform {
    use super::*;
    use enigo::{Direction, Enigo, Key as EnigoKey, Keyboard, Settings};
    use std::sync::Mutex as StdMutex;

    /// Enigo-based input driver.
    pub struct EnigoDriver {
        enigo: StdMutex<Enigo>,
    }

    impl EnigoDriver {
        pub fn new() -> InputResult<Self> {
            let enigo = Enigo::new(&Settings::default())
                .map_err(|e| InputError::SimulationFailed(e.to_string()))?;
            Ok(Self {
                enigo: StdMutex::new(enigo),
            })
        }

        fn convert_key(key: KeyInput) -> EnigoKey {
            match key {
                // Unicode keys carry their own shift state
                KeyInput::Char(c) => EnigoKey::Unicode(c),
                KeyInput::Enter => EnigoKey::Return,
                KeyInput::Arrow(ArrowDirection::Up) => EnigoKey::UpArrow,
                KeyInput::Arrow(ArrowDirection::Down) => EnigoKey::DownArrow,
                KeyInput::Arrow(ArrowDirection::Left) => EnigoKey::LeftArrow,
                KeyInput::Arrow(ArrowDirection::Right) => EnigoKey::RightArrow,
            }
        }

        fn send(&self, key: KeyInput, direction: Direction) -> InputResult<()> {
            let mut enigo = self.enigo.lock().map_err(|e| {
                InputError::SimulationFailed(format!("Failed to lock enigo: {}", e))
            })?;
            enigo
                .key(Self::convert_key(key), direction)
                .map_err(|e| InputError::SimulationFailed(e.to_string()))
        }
    }

    #[async_trait]
    impl InputDriver for EnigoDriver {
        fn is_available(&self) -> bool {
            true
        }

        async fn focus(&self, window: &GameWindow) -> bool {
            let window = window.clone();
            tokio::task::spawn_blocking(move || crate::focus::focus_window(&window))
                .await
                .unwrap_or(false)
        }

        async fn key_down(&self, key: KeyInput) -> InputResult<()> {
            self.send(key, Direction::Press)
        }

        async fn key_up(&self, key: KeyInput) -> InputResult<()> {
            self.send(key, Direction::Release)
        }
    }
}

/// Create the input driver for the current platform.
#[cfg(feature = "gui-automation")]
pub fn create_input_driver() -> InputResult<Box<dyn InputDriver>> {
    Ok(Box::new(platform::EnigoDriver::new()?))
}

#[cfg(not(feature = "gui-automation"))]
pub fn create_input_driver() -> InputResult<Box<dyn InputDriver>> {
    Ok(Box::new(mock::MockDriver::new()))
}

/// Mock input driver for testing.
/// Always available for tests, even when gui-automation is enabled.
pub mod mock {
    use super::*;

    /// Records every call instead of synthesizing input. Clones share state.
    #[derive(Clone)]
    pub struct MockDriver {
        actions: Arc<Mutex<VecDeque<String>>>,
        focus_failures: Arc<AtomicUsize>,
        focus_grace: Arc<AtomicUsize>,
        focus_calls: Arc<AtomicUsize>,
        fail_keys: Arc<AtomicBool>,
        max_log_size: usize,
    }

    impl MockDriver {
        pub fn new() -> Self {
            Self {
                actions: Arc::new(Mutex::new(VecDeque::new())),
                focus_failures: Arc::new(AtomicUsize::new(0)),
                focus_grace: Arc::new(AtomicUsize::new(0)),
                focus_calls: Arc::new(AtomicUsize::new(0)),
                fail_keys: Arc::new(AtomicBool::new(false)),
                max_log_size: 1000,
            }
        }

        /// Make the next `count` focus attempts fail.
        pub fn fail_next_focus(&self, count: usize) {
            self.focus_grace.store(0, Ordering::SeqCst);
            self.focus_failures.store(count, Ordering::SeqCst);
        }

        /// Let `successes` focus attempts through, then fail the next `count`.
        pub fn fail_focus_after(&self, successes: usize, count: usize) {
            self.focus_grace.store(successes, Ordering::SeqCst);
            self.focus_failures.store(count, Ordering::SeqCst);
        }

        /// Make every key event fail.
        pub fn fail_keys(&self, fail: bool) {
            self.fail_keys.store(fail, Ordering::SeqCst);
        }

        pub fn focus_calls(&self) -> usize {
            self.focus_calls.load(Ordering::SeqCst)
        }

        /// Get the action log.
        pub async fn actions(&self) -> Vec<String> {
            self.actions.lock().await.iter().cloned().collect()
        }

        /// Keys that completed a full down/up cycle, rendered as text.
        /// Characters appear as-is, Enter as `⏎`, arrows as `<UP>` etc.
        pub async fn typed(&self) -> String {
            self.actions
                .lock()
                .await
                .iter()
                .filter_map(|a| a.strip_prefix("key_up(").and_then(|s| s.strip_suffix(')')))
                .map(|k| if k == "Enter" { "⏎" } else { k })
                .collect()
        }

        /// Clear the action log.
        pub async fn clear_log(&self) {
            self.actions.lock().await.clear();
        }

        async fn log(&self, action: String) {
            let mut actions = self.actions.lock().await;
            if actions.len() >= self.max_log_size {
                actions.pop_front();
            }
            actions.push_back(action);
        }

        fn render(key: KeyInput) -> String {
            match key {
                KeyInput::Char(c) => c.to_string(),
                KeyInput::Enter => "Enter".to_string(),
                KeyInput::Arrow(direction) => format!("<{}>", direction),
            }
        }
    }

    impl Default for MockDriver {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl InputDriver for MockDriver {
        fn is_available(&self) -> bool {
            true
        }

        async fn focus(&self, window: &GameWindow) -> bool {
            self.focus_calls.fetch_add(1, Ordering::SeqCst);
            let graced = self
                .focus_grace
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            let failing = !graced
                && self
                    .focus_failures
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
            self.log(format!("focus({}) -> {}", window.id, !failing)).await;
            !failing
        }

        async fn key_down(&self, key: KeyInput) -> InputResult<()> {
            if self.fail_keys.load(Ordering::SeqCst) {
                return Err(InputError::SimulationFailed("scripted failure".to_string()));
            }
            self.log(format!("key_down({})", Self::render(key))).await;
            Ok(())
        }

        async fn key_up(&self, key: KeyInput) -> InputResult<()> {
            self.log(format!("key_up({})", Self::render(key))).await;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockDriver;
    use super::*;

    fn dispatcher(driver: &MockDriver) -> InputDispatcher {
        InputDispatcher::new(Box::new(driver.clone()), GameWindow::new(9, "Warsim"))
            .with_timing(KeyTiming::instant())
    }

    #[test]
    fn test_default_timing() {
        let timing = KeyTiming::default();
        assert_eq!(timing.hold, Duration::from_millis(30));
        assert_eq!(timing.settle, Duration::from_millis(50));
    }

    #[test]
    fn test_arrow_direction_names() {
        assert_eq!(ArrowDirection::from_name("left"), Some(ArrowDirection::Left));
        assert_eq!(ArrowDirection::from_name(" UP "), Some(ArrowDirection::Up));
        assert_eq!(ArrowDirection::from_name("north"), None);
        assert_eq!(ArrowDirection::Right.to_string(), "RIGHT");
    }

    #[tokio::test]
    async fn test_send_key_taps_down_then_up() {
        let driver = MockDriver::new();
        dispatcher(&driver).send_key('y').await.unwrap();

        let actions = driver.actions().await;
        assert_eq!(
            actions,
            vec!["focus(9) -> true", "key_down(y)", "key_up(y)"]
        );
    }

    #[tokio::test]
    async fn test_send_text_focuses_per_character() {
        let driver = MockDriver::new();
        let input = dispatcher(&driver);
        input.send_text("Bob").await.unwrap();
        input.send_enter().await.unwrap();

        assert_eq!(driver.typed().await, "Bob⏎");
        assert_eq!(driver.focus_calls(), 4);
    }

    #[tokio::test]
    async fn test_send_arrow() {
        let driver = MockDriver::new();
        dispatcher(&driver)
            .send_arrow(ArrowDirection::Down)
            .await
            .unwrap();
        assert_eq!(driver.typed().await, "<DOWN>");
    }

    #[tokio::test]
    async fn test_focus_failure_sends_nothing() {
        let driver = MockDriver::new();
        driver.fail_next_focus(1);
        let result = dispatcher(&driver).send_key('1').await;

        assert!(matches!(result, Err(InputError::FocusFailed(_))));
        assert_eq!(driver.typed().await, "");
        assert_eq!(driver.focus_calls(), 1);
    }

    #[tokio::test]
    async fn test_key_failure_propagates() {
        let driver = MockDriver::new();
        driver.fail_keys(true);
        let result = dispatcher(&driver).send_enter().await;
        assert!(matches!(result, Err(InputError::SimulationFailed(_))));
    }
}
