//! Locating the game window.
//!
//! The search runs in a fixed order and stops at the first hit:
//!
//! 1. a visible window owned by a process with the configured name
//! 2. a host-terminal window whose title mentions the game
//! 3. a child of a host-terminal window whose title mentions the game
//! 4. any top-level window whose title mentions the game
//! 5. the first host-terminal window
//!
//! Enumeration goes through [`WindowSource`] so the search can run against
//! a fixed window list in tests.

use crate::capture::{CaptureResult, GameWindow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Application names of common terminal hosts.
const TERMINAL_HOSTS: &[&str] = &[
    "windowsterminal",
    "conhost",
    "cmd",
    "gnome-terminal",
    "gnome-terminal-server",
    "konsole",
    "xterm",
    "alacritty",
    "kitty",
    "wezterm",
    "wezterm-gui",
    "terminal",
    "iterm2",
];

/// What the locator looks for. Bound from the `Game` config table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WindowQuery {
    /// Process name of the game executable
    pub process_name: String,
    /// Substrings that identify the game in a window title
    pub title_keywords: Vec<String>,
    /// Substrings that identify a terminal host in a window title
    pub terminal_markers: Vec<String>,
}

impl Default for WindowQuery {
    fn default() -> Self {
        Self {
            process_name: "Warsim".to_string(),
            title_keywords: vec!["Warsim".to_string(), "Aslona".to_string()],
            terminal_markers: vec!["Windows Terminal".to_string()],
        }
    }
}

impl WindowQuery {
    /// Case-insensitive match of `title` against the game keywords.
    pub fn title_matches(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.title_keywords
            .iter()
            .filter(|k| !k.is_empty())
            .any(|k| title.contains(&k.to_lowercase()))
    }

    /// Whether `window` looks like a terminal emulator hosting a console app.
    pub fn is_terminal(&self, window: &GameWindow) -> bool {
        let title = window.title.to_lowercase();
        let by_title = self
            .terminal_markers
            .iter()
            .filter(|m| !m.is_empty())
            .any(|m| title.contains(&m.to_lowercase()));
        by_title || TERMINAL_HOSTS.contains(&normalize_process_name(&window.app_name).as_str())
    }

    /// Whether `name` is the configured game process.
    pub fn is_game_process(&self, name: &str) -> bool {
        !self.process_name.is_empty()
            && normalize_process_name(name) == normalize_process_name(&self.process_name)
    }
}

/// Lowercase and strip a trailing `.exe`.
pub fn normalize_process_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    lower
        .strip_suffix(".exe")
        .map(str::to_string)
        .unwrap_or(lower)
}

/// Which search stage produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    ProcessName,
    TerminalTitle,
    TerminalChild,
    WindowTitle,
    TerminalFallback,
}

/// A located window and how it was found.
#[derive(Debug, Clone)]
pub struct WindowMatch {
    pub window: GameWindow,
    pub strategy: MatchStrategy,
}

/// Window and process enumeration.
pub trait WindowSource {
    /// All top-level windows.
    fn windows(&self) -> CaptureResult<Vec<GameWindow>>;

    /// Child windows of `parent`. Empty where the platform has no such notion.
    fn child_windows(&self, parent: &GameWindow) -> Vec<GameWindow>;

    /// Ids of running processes whose name matches `name`.
    fn pids_for_process(&self, name: &str) -> Vec<u32>;
}

/// Runs the search order over a [`WindowSource`].
pub struct WindowLocator<'a, S: WindowSource + ?Sized> {
    source: &'a S,
    query: WindowQuery,
}

impl<'a, S: WindowSource + ?Sized> WindowLocator<'a, S> {
    pub fn new(source: &'a S, query: WindowQuery) -> Self {
        Self { source, query }
    }

    /// Find the game window, or `None` when nothing plausible exists.
    pub fn locate(&self) -> Option<GameWindow> {
        self.find().map(|m| m.window)
    }

    /// Find the game window along with the stage that matched.
    pub fn find(&self) -> Option<WindowMatch> {
        let windows = match self.source.windows() {
            Ok(windows) => windows,
            Err(e) => {
                warn!("Window enumeration failed: {}", e);
                return None;
            }
        };
        debug!("Enumerated {} windows", windows.len());

        let found = self
            .by_process(&windows)
            .or_else(|| self.by_terminal_title(&windows))
            .or_else(|| self.by_terminal_child(&windows))
            .or_else(|| self.by_title(&windows))
            .or_else(|| self.terminal_fallback(&windows));

        match &found {
            Some(m) => info!(
                "Located game window '{}' (id {}) via {:?}",
                m.window.title, m.window.id, m.strategy
            ),
            None => warn!("No window matched {:?}", self.query.title_keywords),
        }
        found
    }

    fn by_process(&self, windows: &[GameWindow]) -> Option<WindowMatch> {
        if self.query.process_name.is_empty() {
            return None;
        }
        let pids = self.source.pids_for_process(&self.query.process_name);
        debug!(
            "Found {} '{}' processes",
            pids.len(),
            self.query.process_name
        );

        windows
            .iter()
            .filter(|w| !w.is_minimized)
            .find(|w| {
                (w.pid != 0 && pids.contains(&w.pid)) || self.query.is_game_process(&w.app_name)
            })
            .map(|w| matched(w, MatchStrategy::ProcessName))
    }

    fn terminals<'w>(&self, windows: &'w [GameWindow]) -> Vec<&'w GameWindow> {
        windows
            .iter()
            .filter(|w| self.query.is_terminal(w))
            .collect()
    }

    fn by_terminal_title(&self, windows: &[GameWindow]) -> Option<WindowMatch> {
        self.terminals(windows)
            .into_iter()
            .find(|w| self.query.title_matches(&w.title))
            .map(|w| matched(w, MatchStrategy::TerminalTitle))
    }

    fn by_terminal_child(&self, windows: &[GameWindow]) -> Option<WindowMatch> {
        self.terminals(windows).into_iter().find_map(|terminal| {
            let children = self.source.child_windows(terminal);
            debug!(
                "Terminal '{}' has {} child windows",
                terminal.title,
                children.len()
            );
            children
                .iter()
                .find(|c| self.query.title_matches(&c.title))
                .map(|c| matched(c, MatchStrategy::TerminalChild))
        })
    }

    fn by_title(&self, windows: &[GameWindow]) -> Option<WindowMatch> {
        windows
            .iter()
            .find(|w| self.query.title_matches(&w.title))
            .map(|w| matched(w, MatchStrategy::WindowTitle))
    }

    fn terminal_fallback(&self, windows: &[GameWindow]) -> Option<WindowMatch> {
        self.terminals(windows).first().map(|w| {
            warn!(
                "No game window found, falling back to terminal '{}'",
                w.title
            );
            matched(w, MatchStrategy::TerminalFallback)
        })
    }
}

fn matched(window: &GameWindow, strategy: MatchStrategy) -> WindowMatch {
    WindowMatch {
        window: window.clone(),
        strategy,
    }
}

/// Name of the process with `pid`, if it is still running.
pub fn process_name(pid: u32) -> Option<String> {
    use sysinfo::{Pid, ProcessesToUpdate, System};

    if pid == 0 {
        return None;
    }
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system
        .process(pid)
        .map(|p| p.name().to_string_lossy().into_owned())
}

/// Ids of running processes named `name` (case-insensitive, `.exe` ignored).
pub fn find_process_ids(name: &str) -> Vec<u32> {
    use sysinfo::{ProcessesToUpdate, System};

    let target = normalize_process_name(name);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    system
        .processes()
        .values()
        .filter(|p| normalize_process_name(&p.name().to_string_lossy()) == target)
        .map(|p| p.pid().as_u32())
        .collect()
}

/// Desktop window enumeration using xcap and sysinfo.
#[cfg(feature = "gui-automation")]
pub mod platform {
    use super::*;
    use crate::capture::{CaptureError, Region};

    #[derive(Debug, Default)]
    pub struct DesktopWindows;

    impl DesktopWindows {
        pub fn new() -> Self {
            Self
        }

        fn convert(window: &xcap::Window) -> Option<GameWindow> {
            let id = window.id().ok()?;
            let region = Region::new(
                window.x().unwrap_or(0),
                window.y().unwrap_or(0),
                window.width().unwrap_or(0),
                window.height().unwrap_or(0),
            );
            Some(GameWindow {
                id: id as u64,
                title: window.title().unwrap_or_default(),
                app_name: window.app_name().unwrap_or_default(),
                pid: window.pid().unwrap_or(0),
                region,
                is_minimized: window.is_minimized().unwrap_or(false),
            })
        }
    }

    impl WindowSource for DesktopWindows {
        fn windows(&self) -> CaptureResult<Vec<GameWindow>> {
            let windows =
                xcap::Window::all().map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
            Ok(windows.iter().filter_map(Self::convert).collect())
        }

        fn child_windows(&self, parent: &GameWindow) -> Vec<GameWindow> {
            child_windows(parent)
        }

        fn pids_for_process(&self, name: &str) -> Vec<u32> {
            find_process_ids(name)
        }
    }

    #[cfg(target_os = "windows")]
    fn child_windows(parent: &GameWindow) -> Vec<GameWindow> {
        use windows_sys::Win32::Foundation::{BOOL, HWND, LPARAM};
        use windows_sys::Win32::UI::WindowsAndMessaging::{
            EnumChildWindows, GetWindowTextLengthW, GetWindowTextW,
        };

        unsafe extern "system" fn collect(hwnd: HWND, lparam: LPARAM) -> BOOL {
            // SAFETY: lparam is the &mut Vec passed below, alive for the call.
            let handles = &mut *(lparam as *mut Vec<HWND>);
            handles.push(hwnd);
            1
        }

        let mut handles: Vec<HWND> = Vec::new();
        // SAFETY: the callback only touches `handles`, which outlives the call.
        unsafe {
            EnumChildWindows(
                parent.id as HWND,
                Some(collect),
                &mut handles as *mut Vec<HWND> as LPARAM,
            );
        }

        handles
            .into_iter()
            .map(|hwnd| {
                // SAFETY: buffer is sized from GetWindowTextLengthW plus the terminator.
                let title = unsafe {
                    let len = GetWindowTextLengthW(hwnd);
                    if len <= 0 {
                        String::new()
                    } else {
                        let mut buf = vec![0u16; len as usize + 1];
                        let copied = GetWindowTextW(hwnd, buf.as_mut_ptr(), buf.len() as i32);
                        String::from_utf16_lossy(&buf[..copied.max(0) as usize])
                    }
                };
                GameWindow {
                    id: hwnd as u64,
                    title,
                    app_name: parent.app_name.clone(),
                    pid: parent.pid,
                    region: parent.region,
                    is_minimized: false,
                }
            })
            .collect()
    }

    #[cfg(not(target_os = "windows"))]
    fn child_windows(_parent: &GameWindow) -> Vec<GameWindow> {
        Vec::new()
    }
}

/// Create the window source for the current platform.
#[cfg(feature = "gui-automation")]
pub fn create_window_source() -> Box<dyn WindowSource> {
    Box::new(platform::DesktopWindows::new())
}

#[cfg(not(feature = "gui-automation"))]
pub fn create_window_source() -> Box<dyn WindowSource> {
    Box::new(mock::FixedWindows::default())
}

/// Fixed window lists for tests.
pub mod mock {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Default, Clone)]
    pub struct FixedWindows {
        pub windows: Vec<GameWindow>,
        pub children: HashMap<u64, Vec<GameWindow>>,
        pub processes: HashMap<String, Vec<u32>>,
    }

    impl FixedWindows {
        pub fn new(windows: Vec<GameWindow>) -> Self {
            Self {
                windows,
                ..Default::default()
            }
        }

        pub fn with_children(mut self, parent: u64, children: Vec<GameWindow>) -> Self {
            self.children.insert(parent, children);
            self
        }

        pub fn with_process(mut self, name: &str, pids: Vec<u32>) -> Self {
            self.processes.insert(normalize_process_name(name), pids);
            self
        }
    }

    impl WindowSource for FixedWindows {
        fn windows(&self) -> CaptureResult<Vec<GameWindow>> {
            Ok(self.windows.clone())
        }

        fn child_windows(&self, parent: &GameWindow) -> Vec<GameWindow> {
            self.children.get(&parent.id).cloned().unwrap_or_default()
        }

        fn pids_for_process(&self, name: &str) -> Vec<u32> {
            self.processes
                .get(&normalize_process_name(name))
                .cloned()
                .unwrap_or_default()
        }
    }
}
