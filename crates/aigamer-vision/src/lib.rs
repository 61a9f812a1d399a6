//! # AIGamer Vision
//!
//! Everything that touches the desktop:
//!
//! - **Window location**: find the game by process name, window title or the
//!   terminal hosting it
//! - **Capture**: grab the game window's pixels and encode them for a vision
//!   model
//! - **Input**: focus the window and synthesize key presses
//!
//! Desktop access is behind the `gui-automation` feature (on by default).
//! Without it, capture and input fall back to the mock implementations.

pub mod capture;
pub mod config;
pub mod focus;
pub mod input;
pub mod window;

pub use capture::{
    create_screen_capture, save_debug_frame, CaptureError, CaptureResult, GameWindow, Region,
    ScreenCapture, Screenshot,
};
pub use config::{CaptureSettings, ImageFormat};
pub use input::{
    create_input_driver, ArrowDirection, InputDispatcher, InputDriver, InputError, InputResult,
    KeyInput, KeyTiming,
};
pub use window::{
    create_window_source, process_name, MatchStrategy, WindowLocator, WindowMatch, WindowQuery,
    WindowSource,
};
