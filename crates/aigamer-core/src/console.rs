//! Terminal output that stays readable while the terminal is in raw mode.
//!
//! Raw mode disables the `\n` → `\r\n` translation, so every line written
//! here gets an explicit carriage return. One lock serialises status lines,
//! tracing output and the key listener's event reads.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Debug, Clone, Default)]
pub struct Console {
    lock: Arc<Mutex<()>>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the terminal exclusively.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Print one status line.
    pub fn line(&self, message: impl AsRef<str>) {
        let mut text = message.as_ref().to_string();
        text.push('\n');
        self.write_raw(text.as_bytes());
    }

    /// A `MakeWriter` for a tracing `fmt` layer.
    pub fn writer(&self) -> ConsoleWriter {
        ConsoleWriter {
            console: self.clone(),
        }
    }

    fn write_raw(&self, bytes: &[u8]) {
        let text = to_crlf(&String::from_utf8_lossy(bytes));
        let _guard = self.lock();
        let mut out = io::stdout().lock();
        // Nowhere left to report a failed terminal write.
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

/// Normalise line endings to `\r\n`.
pub fn to_crlf(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}

#[derive(Debug, Clone)]
pub struct ConsoleWriter {
    console: Console,
}

impl<'a> MakeWriter<'a> for ConsoleWriter {
    type Writer = ConsoleLine;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleLine {
            console: self.console.clone(),
            buf: Vec::new(),
        }
    }
}

/// Buffers one formatted event and prints it on drop.
pub struct ConsoleLine {
    console: Console,
    buf: Vec<u8>,
}

impl Write for ConsoleLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleLine {
    fn drop(&mut self) {
        if !self.buf.is_empty() {
            self.console.write_raw(&self.buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_crlf() {
        assert_eq!(to_crlf("a\nb\r\nc"), "a\r\nb\r\nc");
        assert_eq!(to_crlf("plain"), "plain");
    }

    #[test]
    fn test_writer_buffers_until_drop() {
        let console = Console::new();
        let writer = console.writer();
        let mut line = writer.make_writer();
        line.write_all(b"partial").unwrap();
        assert_eq!(line.buf, b"partial");

        // Lock is free while a line is being formatted.
        drop(console.lock());
    }
}
