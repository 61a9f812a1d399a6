//! # AIGamer Core
//!
//! The capture → read → decide → type cycle and everything around it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        GameLoop                          │
//! │                                                          │
//! │  ScreenCapture ─► VisionTranscriber ─► DecisionClient    │
//! │                                             │            │
//! │        InputDispatcher ◄─ classify ◄─ parse_action       │
//! │                                                          │
//! │  LoopControl (pause / step / delay)    SessionLog        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop is driven from a tokio task; [`LoopControl`] is shared with the
//! key listener thread.

pub mod command;
pub mod console;
pub mod control;
pub mod game_loop;
pub mod parser;
pub mod session_log;

pub use command::{classify, dispatch, GameCommand, GameCommandKind};
pub use console::{Console, ConsoleWriter};
pub use control::{
    ControlKey, ControlNotice, ControlState, DelayBounds, Gate, LoopControl, LoopState,
    CONTROLS_HELP,
};
pub use game_loop::{CycleOutcome, GameLoop, LoopSettings};
pub use parser::parse_action;
pub use session_log::{SessionLog, SessionLogWriter};

use thiserror::Error;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Provider error: {0}")]
    ProviderError(#[from] aigamer_providers::ProviderError),

    #[error("Capture error: {0}")]
    CaptureError(#[from] aigamer_vision::CaptureError),

    #[error("Input error: {0}")]
    InputError(#[from] aigamer_vision::InputError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
