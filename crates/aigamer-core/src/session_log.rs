//! # Session Log
//!
//! Plain-text transcript of one play session: every screen the model saw,
//! every action it chose and every control event.
//!
//! Writes are best-effort. The first failed write disables the log for the
//! rest of the session and the game keeps running.

use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;
use tracing_subscriber::fmt::MakeWriter;

const FILE_PREFIX: &str = "warsim_session";

#[derive(Debug)]
struct LogFile {
    path: PathBuf,
    file: Mutex<File>,
    enabled: AtomicBool,
}

/// Shared handle to the session log file. Clones write to the same file.
#[derive(Debug, Clone)]
pub struct SessionLog {
    inner: Arc<LogFile>,
}

impl SessionLog {
    /// Create `<dir>/warsim_session_[<name>_]<yyyyMMdd_HHmmss>.log` and write
    /// the header.
    pub fn create(dir: &Path, session_name: Option<&str>) -> io::Result<Self> {
        fs::create_dir_all(dir)?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let file_name = match session_name.and_then(sanitize_name) {
            Some(name) => format!("{}_{}_{}.log", FILE_PREFIX, name, timestamp),
            None => format!("{}_{}.log", FILE_PREFIX, timestamp),
        };
        let path = dir.join(file_name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let log = Self {
            inner: Arc::new(LogFile {
                path,
                file: Mutex::new(file),
                enabled: AtomicBool::new(true),
            }),
        };

        log.log_message("=== WARSIM AI PLAYER SESSION LOG ===");
        log.log_message(&format!(
            "Session started: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        log.log_message("====================================");
        log.log_message("");
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// A `MakeWriter` that appends tracing events to this file.
    pub fn writer(&self) -> SessionLogWriter {
        SessionLogWriter { log: self.clone() }
    }

    pub fn log_message(&self, message: &str) {
        let mut line = String::with_capacity(message.len() + 1);
        line.push_str(message);
        line.push('\n');
        self.append(line.as_bytes());
    }

    pub fn log_system_event(&self, event: &str) {
        self.log_message(&format!("[SYSTEM] [{}] {}\n", clock(), event));
    }

    pub fn log_game_state(&self, game_state: &str) {
        self.log_message(&format!(
            "------ GAME STATE ------\n[{}]\n{}\n------------------------\n",
            clock(),
            game_state
        ));
    }

    /// Record a chosen action, with the model's raw reply when there is one.
    pub fn log_ai_action(&self, action: &str, raw_response: Option<&str>) {
        let mut block = format!("------ AI ACTION -------\n[{}]\nAction: {}\n", clock(), action);
        if let Some(raw) = raw_response.filter(|r| !r.is_empty()) {
            block.push_str(&format!("\nRaw Response:\n{}\n", raw));
        }
        block.push_str("------------------------\n");
        self.log_message(&block);
    }

    pub fn log_error(&self, error: &str) {
        self.log_message(&format!(
            "------ ERROR -------\n[{}]\n{}\n-------------------\n",
            clock(),
            error
        ));
    }

    fn append(&self, bytes: &[u8]) {
        if !self.is_enabled() {
            return;
        }

        let result = {
            let mut file = self.inner.file.lock().unwrap_or_else(PoisonError::into_inner);
            file.write_all(bytes).and_then(|_| file.flush())
        };

        if let Err(e) = result {
            // Disable before reporting so the warning isn't routed back here.
            self.inner.enabled.store(false, Ordering::SeqCst);
            warn!("Error writing to log file {}: {}", self.inner.path.display(), e);
        }
    }
}

/// Keep a session name safe for use in a file name.
fn sanitize_name(name: &str) -> Option<String> {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn clock() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

#[derive(Debug, Clone)]
pub struct SessionLogWriter {
    log: SessionLog,
}

impl<'a> MakeWriter<'a> for SessionLogWriter {
    type Writer = SessionLogLine;

    fn make_writer(&'a self) -> Self::Writer {
        SessionLogLine {
            log: self.log.clone(),
            buf: Vec::new(),
        }
    }
}

/// Buffers one formatted event and appends it on drop.
pub struct SessionLogLine {
    log: SessionLog,
    buf: Vec<u8>,
}

impl Write for SessionLogLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for SessionLogLine {
    fn drop(&mut self) {
        if !self.buf.is_empty() {
            self.log.append(&self.buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read(log: &SessionLog) -> String {
        fs::read_to_string(log.path()).unwrap()
    }

    #[test]
    fn test_file_name_and_header() {
        let dir = TempDir::new().unwrap();
        let log = SessionLog::create(dir.path(), Some("first run")).unwrap();

        let name = log.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("warsim_session_first_run_"));
        assert!(name.ends_with(".log"));

        let text = read(&log);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "=== WARSIM AI PLAYER SESSION LOG ===");
        assert!(lines[1].starts_with("Session started: "));
        assert_eq!(lines[2], "====================================");
        assert_eq!(lines[3], "");
    }

    #[test]
    fn test_unnamed_session() {
        let dir = TempDir::new().unwrap();
        let log = SessionLog::create(dir.path(), Some("   ")).unwrap();
        let name = log.path().file_name().unwrap().to_string_lossy().to_string();
        // warsim_session_yyyyMMdd_HHmmss.log
        assert_eq!(name.len(), "warsim_session_".len() + 15 + ".log".len());
    }

    #[test]
    fn test_entry_blocks() {
        let dir = TempDir::new().unwrap();
        let log = SessionLog::create(dir.path(), None).unwrap();

        log.log_system_event("AI Warsim Player initialized");
        log.log_ai_action("3", Some("ACTION: 3"));
        log.log_ai_action("y", None);
        log.log_error("Failed to get AI action from screen");
        log.log_game_state("1) Explore");

        let text = read(&log);
        assert!(text.contains("[SYSTEM] ["));
        assert!(text.contains("] AI Warsim Player initialized\n"));
        assert!(text.contains("------ AI ACTION -------\n["));
        assert!(text.contains("Action: 3\n\nRaw Response:\nACTION: 3\n------------------------\n"));
        assert!(text.contains("Action: y\n------------------------\n"));
        assert!(text.contains("------ ERROR -------\n"));
        assert!(text.contains("Failed to get AI action from screen\n-------------------\n"));
        assert!(text.contains("------ GAME STATE ------\n"));
    }

    #[test]
    fn test_writer_appends_to_file() {
        let dir = TempDir::new().unwrap();
        let log = SessionLog::create(dir.path(), None).unwrap();
        {
            let writer = log.writer();
            let mut line = writer.make_writer();
            line.write_all(b"INFO traced event\n").unwrap();
        }
        assert!(read(&log).ends_with("INFO traced event\n"));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("a/b c").as_deref(), Some("a_b_c"));
        assert_eq!(sanitize_name(""), None);
    }
}
