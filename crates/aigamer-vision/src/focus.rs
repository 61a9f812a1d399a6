//! Bringing the game window to the foreground.
//!
//! Windows uses `SetForegroundWindow` on the HWND. Linux shells out to
//! `xdotool` and falls back to `wmctrl`. macOS asks the owning application
//! to activate through `osascript`.

use crate::capture::GameWindow;
use tracing::{debug, warn};

/// Try to focus `window`. Returns whether the platform reported success.
pub fn focus_window(window: &GameWindow) -> bool {
    if window.id == 0 {
        warn!("Cannot focus '{}': window has no id", window.title);
        return false;
    }
    let focused = platform_focus(window);
    debug!("Focus '{}' (id {}): {}", window.title, window.id, focused);
    focused
}

#[cfg(target_os = "windows")]
fn platform_focus(window: &GameWindow) -> bool {
    use windows_sys::Win32::UI::WindowsAndMessaging::SetForegroundWindow;

    // SAFETY: the id came from the window system; a stale handle makes the
    // call fail rather than misbehave.
    unsafe { SetForegroundWindow(window.id as isize) != 0 }
}

#[cfg(target_os = "linux")]
fn platform_focus(window: &GameWindow) -> bool {
    use std::process::Command;

    let xdotool = Command::new("xdotool")
        .args(["windowactivate", "--sync", &window.id.to_string()])
        .output();
    match xdotool {
        Ok(output) if output.status.success() => return true,
        Ok(output) => debug!(
            "xdotool windowactivate failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        Err(e) => debug!("xdotool unavailable: {}", e),
    }

    Command::new("wmctrl")
        .args(["-i", "-a", &format!("0x{:08x}", window.id)])
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(target_os = "macos")]
fn platform_focus(window: &GameWindow) -> bool {
    use std::process::Command;

    if window.app_name.is_empty() {
        return false;
    }
    let script = format!(
        "tell application \"{}\" to activate",
        window.app_name.replace('"', "\\\"")
    );
    Command::new("osascript")
        .args(["-e", &script])
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
fn platform_focus(_window: &GameWindow) -> bool {
    false
}
