//! # Game Loop
//!
//! One cycle: focus the game, capture it, have the vision model read the
//! screen, ask the decision model for a move, parse and classify the move,
//! type it into the game, then wait.
//!
//! Every failure inside a cycle is logged and ends that cycle early; the
//! loop itself only ends when [`LoopControl`] says stop.

use crate::command::{classify, dispatch, GameCommand};
use crate::console::Console;
use crate::control::{Gate, LoopControl};
use crate::parser::parse_action;
use crate::session_log::SessionLog;
use crate::Result;
use aigamer_providers::{
    is_error_reply, DecisionClient, VisionTranscriber, ERROR_SENTINEL, SCREEN_READ_PROMPT,
};
use aigamer_vision::{InputDispatcher, ScreenCapture};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const WAIT_POLL: Duration = Duration::from_millis(100);

/// Retry and pacing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    /// Delivery attempts per command
    pub max_retries: u32,
    /// Pause after a failed focus, read or delivery
    pub retry_delay: Duration,
    /// Pause between focusing and capturing
    pub focus_settle: Duration,
    /// Pause after a cycle error
    pub backoff: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            focus_settle: Duration::from_millis(500),
            backoff: Duration::from_secs(2),
        }
    }
}

impl LoopSettings {
    /// No pauses; for tests.
    pub fn immediate() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::ZERO,
            focus_settle: Duration::ZERO,
            backoff: Duration::ZERO,
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The command reached the game
    Executed(GameCommand),
    /// Every delivery attempt failed
    Undelivered(GameCommand),
    /// The game window could not be brought to the front
    FocusFailed,
    /// The vision model returned an error
    TranscriptionFailed,
    /// No usable action in the model's reply
    NoAction,
}

pub struct GameLoop {
    capture: Box<dyn ScreenCapture>,
    input: InputDispatcher,
    decision: Box<dyn DecisionClient>,
    vision: Box<dyn VisionTranscriber>,
    control: LoopControl,
    console: Console,
    log: Option<SessionLog>,
    settings: LoopSettings,
    cycles: u64,
}

impl GameLoop {
    pub fn new(
        capture: Box<dyn ScreenCapture>,
        input: InputDispatcher,
        decision: Box<dyn DecisionClient>,
        vision: Box<dyn VisionTranscriber>,
        control: LoopControl,
    ) -> Self {
        Self {
            capture,
            input,
            decision,
            vision,
            control,
            console: Console::new(),
            log: None,
            settings: LoopSettings::default(),
            cycles: 0,
        }
    }

    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    pub fn with_session_log(mut self, log: SessionLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn control(&self) -> &LoopControl {
        &self.control
    }

    /// Cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run until stopped.
    ///
    /// Each cycle is raced against the stop flag, so a stop request abandons
    /// whatever request is in flight.
    pub async fn run(&mut self) {
        let control = self.control.clone();
        let mut announced_wait = false;
        info!("Game loop started");

        loop {
            match control.gate() {
                Gate::Stop => break,
                Gate::Wait => {
                    if !announced_wait {
                        self.announce_wait();
                        announced_wait = true;
                    }
                    if !control.sleep(WAIT_POLL).await {
                        break;
                    }
                    continue;
                }
                Gate::Proceed => announced_wait = false,
            }

            let result = tokio::select! {
                result = self.run_cycle() => result,
                _ = control.stopped() => break,
            };

            match result {
                Ok(outcome) => debug!("Cycle {} ended: {:?}", self.cycles, outcome),
                Err(e) => {
                    error!("Error in game loop: {}", e);
                    self.console.line(format!("Error in game loop: {}", e));
                    if let Some(log) = &self.log {
                        log.log_error(&format!("Error in game loop: {}", e));
                    }
                    if !control.sleep(self.settings.backoff).await {
                        break;
                    }
                }
            }
        }

        info!("Game loop stopped after {} cycles", self.cycles);
    }

    /// Run one cycle regardless of pause state.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        self.cycles += 1;
        let window = self.input.window().clone();

        if !self.input.focus().await {
            warn!("Failed to focus game window before capturing");
            self.console
                .line("Warning: Failed to focus game window before capturing. Retrying...");
            pause(self.settings.retry_delay).await;
            return Ok(CycleOutcome::FocusFailed);
        }
        pause(self.settings.focus_settle).await;

        self.console.line(format!(
            "Capturing game screen using {} vision...",
            self.vision.model()
        ));
        let screenshot = self.capture.capture_window(&window).await?;
        let game_state = self
            .vision
            .transcribe(&screenshot, Some(SCREEN_READ_PROMPT))
            .await;

        if is_error_reply(&game_state) {
            warn!("Screen transcription failed: {}", game_state);
            self.console
                .line("Warning: Failed to read the game screen. Retrying...");
            if let Some(log) = &self.log {
                log.log_error(&format!("Screen transcription failed: {}", game_state));
            }
            pause(self.settings.retry_delay).await;
            return Ok(CycleOutcome::TranscriptionFailed);
        }
        if let Some(log) = &self.log {
            log.log_game_state(&game_state);
        }

        self.console
            .line("Using AI to analyze game screen and decide next action...");
        let reply = self.decision.decide(&game_state).await;
        if let Some(log) = &self.log {
            log.log_message(&format!("Full AI response: {}", reply));
        }

        let action = parse_action(&reply);
        if action == ERROR_SENTINEL {
            warn!("Failed to get AI action from screen");
            self.console
                .line("Warning: Failed to get AI action from screen. Retrying...");
            if let Some(log) = &self.log {
                log.log_error("Failed to get AI action from screen");
            }
            pause(self.settings.retry_delay).await;
            return Ok(CycleOutcome::NoAction);
        }

        let command = classify(&action);
        if let Some(log) = &self.log {
            log.log_ai_action(&action, Some(&reply));
        }
        self.console.line(format!(
            "Executing command: {} - {}",
            command.kind, command.value
        ));

        let delivered = self.deliver(&command).await;

        let delay = self.control.delay();
        self.console.line(format!(
            "Waiting {:.1} seconds before next action...",
            delay.as_secs_f64()
        ));
        pause(delay).await;

        Ok(if delivered {
            CycleOutcome::Executed(command)
        } else {
            CycleOutcome::Undelivered(command)
        })
    }

    async fn deliver(&self, command: &GameCommand) -> bool {
        let attempts = self.settings.max_retries.max(1);

        for attempt in 1..=attempts {
            if !self.input.focus().await {
                error!(
                    "Failed to focus game window (attempt {}/{})",
                    attempt, attempts
                );
                self.console
                    .line("Warning: Failed to focus game window. Retrying...");
                if let Some(log) = &self.log {
                    log.log_error(&format!(
                        "Failed to focus game window (attempt {}/{})",
                        attempt, attempts
                    ));
                }
                pause(self.settings.retry_delay).await;
                continue;
            }

            match dispatch(&self.input, command).await {
                Ok(()) => return true,
                Err(e) => {
                    error!(
                        "Error executing {} (attempt {}/{}): {}",
                        command, attempt, attempts, e
                    );
                    self.console
                        .line(format!("Error executing action: {}. Retrying...", e));
                    if let Some(log) = &self.log {
                        log.log_error(&format!("Error executing action: {}", e));
                    }
                    pause(self.settings.retry_delay).await;
                }
            }
        }

        error!("Giving up on {} after {} attempts", command, attempts);
        false
    }

    fn announce_wait(&self) {
        let state = self.control.snapshot();
        if state.step_mode {
            self.console
                .line("Step mode active. Press 'N' for next action.");
        } else {
            self.console
                .line("Game is paused. Press 'P' to resume or 'N' for next step.");
        }
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
