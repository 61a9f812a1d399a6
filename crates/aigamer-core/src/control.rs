//! # Loop Control
//!
//! Pause, step and speed state shared between the key listener thread and
//! the game loop task.
//!
//! The listener calls [`LoopControl::apply`] for each recognised key; the
//! loop calls [`LoopControl::gate`] before every cycle and sleeps through
//! [`LoopControl::sleep`] so that a stop request cuts the wait short.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::info;

const STOP_POLL: Duration = Duration::from_millis(100);

pub const CONTROLS_HELP: &str = "\n=== CONTROLS ===\n\
ESC - Exit program\n\
P - Pause/Resume AI actions\n\
S - Toggle step mode (pause after each action)\n\
N - Execute next action (when paused/in step mode)\n\
+ - Increase speed (reduce delay)\n\
- - Decrease speed (increase delay)\n\
R - Reset speed to default\n\
H - Show these controls\n\
==============\n";

/// Inter-cycle delay limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayBounds {
    pub default: Duration,
    pub min: Duration,
    pub max: Duration,
    pub step: Duration,
}

impl Default for DelayBounds {
    fn default() -> Self {
        Self {
            default: Duration::from_millis(2000),
            min: Duration::from_millis(500),
            max: Duration::from_millis(30_000),
            step: Duration::from_millis(1000),
        }
    }
}

impl DelayBounds {
    pub fn clamp(&self, delay: Duration) -> Duration {
        delay.max(self.min).min(self.max)
    }

    /// No waiting at all; for tests.
    pub fn zero() -> Self {
        Self {
            default: Duration::ZERO,
            min: Duration::ZERO,
            max: Duration::ZERO,
            step: Duration::ZERO,
        }
    }
}

/// Where the loop is, as seen from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Paused,
    /// Paused in step mode, waiting for `N`
    StepWaiting,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    pub paused: bool,
    pub step_mode: bool,
    /// One cycle requested while paused
    pub step_pending: bool,
    pub stopped: bool,
    pub delay: Duration,
}

impl ControlState {
    pub fn state(&self) -> LoopState {
        if self.stopped {
            LoopState::Stopped
        } else if self.step_mode {
            LoopState::StepWaiting
        } else if self.paused {
            LoopState::Paused
        } else {
            LoopState::Running
        }
    }
}

/// Keys the listener understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKey {
    Stop,
    TogglePause,
    ToggleStep,
    Next,
    Faster,
    Slower,
    Reset,
    Help,
}

/// What to tell the user after a key was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlNotice {
    /// Line for the terminal
    pub message: String,
    /// Entry for the session log, if the change is worth recording
    pub event: Option<String>,
}

impl ControlNotice {
    fn new(message: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            event: Some(event.into()),
        }
    }
}

/// Decision taken before each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Proceed,
    Wait,
    Stop,
}

/// Shared handle; clones refer to the same state.
#[derive(Debug, Clone)]
pub struct LoopControl {
    inner: Arc<Mutex<ControlState>>,
    bounds: DelayBounds,
}

impl LoopControl {
    pub fn new(bounds: DelayBounds) -> Self {
        let state = ControlState {
            paused: false,
            step_mode: false,
            step_pending: false,
            stopped: false,
            delay: bounds.clamp(bounds.default),
        };
        Self {
            inner: Arc::new(Mutex::new(state)),
            bounds,
        }
    }

    // The state stays consistent across a panicking holder, so a poisoned
    // lock is still usable.
    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn bounds(&self) -> DelayBounds {
        self.bounds
    }

    pub fn snapshot(&self) -> ControlState {
        self.lock().clone()
    }

    pub fn state(&self) -> LoopState {
        self.lock().state()
    }

    pub fn delay(&self) -> Duration {
        self.lock().delay
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    pub fn stop(&self) {
        self.lock().stopped = true;
    }

    /// Apply a key press. `None` when the key has no effect right now.
    pub fn apply(&self, key: ControlKey) -> Option<ControlNotice> {
        let mut state = self.lock();
        let notice = match key {
            ControlKey::Stop => {
                state.stopped = true;
                ControlNotice::new("Stopping AI player...", "User pressed ESC - exiting program")
            }
            ControlKey::TogglePause if state.step_mode => {
                state.paused = true;
                ControlNotice {
                    message: "Step mode active. Press 'S' to leave it or 'N' for next action."
                        .to_string(),
                    event: None,
                }
            }
            ControlKey::TogglePause => {
                state.paused = !state.paused;
                if state.paused {
                    ControlNotice::new("Game PAUSED", "Game PAUSED by user")
                } else {
                    ControlNotice::new("Game RESUMED", "Game RESUMED by user")
                }
            }
            ControlKey::ToggleStep => {
                state.step_mode = !state.step_mode;
                state.paused = state.step_mode;
                if state.step_mode {
                    ControlNotice::new("Step mode ENABLED", "Step mode ENABLED by user")
                } else {
                    ControlNotice::new("Step mode DISABLED", "Step mode DISABLED by user")
                }
            }
            ControlKey::Next => {
                if !state.paused && !state.step_mode {
                    return None;
                }
                state.step_pending = true;
                ControlNotice::new("Executing next step...", "User triggered next step")
            }
            ControlKey::Faster => {
                state.delay = self.bounds.clamp(state.delay.saturating_sub(self.bounds.step));
                ControlNotice::new(
                    format!("Speed increased: {} between actions", seconds(state.delay)),
                    format!("Speed increased to {} between actions", seconds(state.delay)),
                )
            }
            ControlKey::Slower => {
                state.delay = self.bounds.clamp(state.delay + self.bounds.step);
                ControlNotice::new(
                    format!("Speed decreased: {} between actions", seconds(state.delay)),
                    format!("Speed decreased to {} between actions", seconds(state.delay)),
                )
            }
            ControlKey::Reset => {
                state.delay = self.bounds.clamp(self.bounds.default);
                let text = format!("Speed reset to default ({})", seconds(state.delay));
                ControlNotice::new(text.clone(), text)
            }
            ControlKey::Help => ControlNotice {
                message: CONTROLS_HELP.to_string(),
                event: None,
            },
        };
        info!("Control {:?} -> {:?}", key, state.state());
        Some(notice)
    }

    /// Check whether the next cycle may run.
    ///
    /// A pending step is consumed here; afterwards the loop is paused again
    /// only if step mode is still on.
    pub fn gate(&self) -> Gate {
        let mut state = self.lock();
        if state.stopped {
            Gate::Stop
        } else if state.step_pending {
            state.step_pending = false;
            state.paused = state.step_mode;
            Gate::Proceed
        } else if state.paused || state.step_mode {
            Gate::Wait
        } else {
            Gate::Proceed
        }
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&self) {
        while !self.is_stopped() {
            tokio::time::sleep(STOP_POLL).await;
        }
    }

    /// Sleep for `duration` unless stopped first. Returns `false` on stop.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.is_stopped();
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_stopped(),
            _ = self.stopped() => false,
        }
    }
}

impl Default for LoopControl {
    fn default() -> Self {
        Self::new(DelayBounds::default())
    }
}

fn seconds(delay: Duration) -> String {
    format!("{:.1} seconds", delay.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_toggle() {
        let control = LoopControl::default();
        assert_eq!(control.gate(), Gate::Proceed);

        let notice = control.apply(ControlKey::TogglePause).unwrap();
        assert_eq!(notice.message, "Game PAUSED");
        assert_eq!(control.state(), LoopState::Paused);
        assert_eq!(control.gate(), Gate::Wait);

        control.apply(ControlKey::TogglePause);
        assert_eq!(control.state(), LoopState::Running);
    }

    #[test]
    fn test_step_mode_runs_one_cycle_per_next() {
        let control = LoopControl::default();
        control.apply(ControlKey::ToggleStep);
        assert_eq!(control.state(), LoopState::StepWaiting);
        assert_eq!(control.gate(), Gate::Wait);

        control.apply(ControlKey::Next);
        assert_eq!(control.gate(), Gate::Proceed);
        assert_eq!(control.gate(), Gate::Wait);
        assert_eq!(control.state(), LoopState::StepWaiting);

        control.apply(ControlKey::ToggleStep);
        assert_eq!(control.state(), LoopState::Running);
        assert_eq!(control.gate(), Gate::Proceed);
    }

    #[test]
    fn test_pause_key_keeps_step_mode() {
        let control = LoopControl::default();
        control.apply(ControlKey::ToggleStep);
        let notice = control.apply(ControlKey::TogglePause).unwrap();
        assert!(notice.message.contains("Step mode active"));

        assert_eq!(control.state(), LoopState::StepWaiting);
        assert_eq!(control.gate(), Gate::Wait);
        assert_eq!(control.gate(), Gate::Wait);

        control.apply(ControlKey::Next);
        assert_eq!(control.gate(), Gate::Proceed);
        assert_eq!(control.gate(), Gate::Wait);
    }

    #[test]
    fn test_next_while_paused_resumes_after_one_cycle() {
        let control = LoopControl::default();
        control.apply(ControlKey::TogglePause);
        control.apply(ControlKey::Next);

        assert_eq!(control.gate(), Gate::Proceed);
        assert_eq!(control.state(), LoopState::Running);
    }

    #[test]
    fn test_next_while_running_is_ignored() {
        let control = LoopControl::default();
        assert!(control.apply(ControlKey::Next).is_none());
        assert!(!control.snapshot().step_pending);
    }

    #[test]
    fn test_delay_is_clamped() {
        let control = LoopControl::default();
        for _ in 0..5 {
            control.apply(ControlKey::Faster);
        }
        assert_eq!(control.delay(), Duration::from_millis(500));

        for _ in 0..40 {
            control.apply(ControlKey::Slower);
        }
        assert_eq!(control.delay(), Duration::from_millis(30_000));

        let notice = control.apply(ControlKey::Reset).unwrap();
        assert_eq!(control.delay(), Duration::from_millis(2000));
        assert_eq!(notice.message, "Speed reset to default (2.0 seconds)");
    }

    #[test]
    fn test_stop_wins_over_everything() {
        let control = LoopControl::default();
        control.apply(ControlKey::ToggleStep);
        control.apply(ControlKey::Next);
        control.apply(ControlKey::Stop);
        assert_eq!(control.gate(), Gate::Stop);
        assert_eq!(control.state(), LoopState::Stopped);
    }

    #[test]
    fn test_help_is_not_logged() {
        let notice = LoopControl::default().apply(ControlKey::Help).unwrap();
        assert!(notice.message.contains("=== CONTROLS ==="));
        assert!(notice.event.is_none());
    }

    #[tokio::test]
    async fn test_sleep_interrupted_by_stop() {
        let control = LoopControl::default();
        let stopper = control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stopper.stop();
        });

        let started = std::time::Instant::now();
        assert!(!control.sleep(Duration::from_secs(30)).await);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
