// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-atomic prefixed output (§5, §9 "Prefixed writers"). Buffers partial
//! lines and flushes `prefix + line + '\n'` as one write under a shared
//! mutex, so concurrent executers never interleave mid-line on the combined
//! stdout/stderr.

use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// Shared sink that every prefix writer funnels through. Clone to hand the
/// same destination to multiple executers.
#[derive(Clone)]
pub struct SharedSink(Arc<Mutex<Box<dyn Write + Send>>>);

impl SharedSink {
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        SharedSink(Arc::new(Mutex::new(Box::new(sink))))
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut guard = self.0.lock();
        guard.write_all(line.as_bytes())?;
        guard.write_all(b"\n")?;
        guard.flush()
    }
}

/// Prepends `prefix` to every complete line written through it, draining a
/// `SharedSink` under its mutex so the write of `prefix + line + "\n"` is
/// atomic relative to any other `PrefixWriter` on the same sink.
pub struct PrefixWriter {
    prefix: String,
    sink: SharedSink,
    pending: String,
}

impl PrefixWriter {
    pub fn new(prefix: impl Into<String>, sink: SharedSink) -> Self {
        PrefixWriter {
            prefix: prefix.into(),
            sink,
            pending: String::new(),
        }
    }

    /// Feeds one already-decoded line of text (no trailing newline) through
    /// the writer, applying the prefix.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        self.sink.write_line(&format!("{}{}", self.prefix, line))
    }

    /// Feeds raw bytes that may contain zero, one, or many newlines,
    /// emitting each complete line as it is found and buffering the
    /// remainder for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        self.pending.push_str(&text);
        while let Some(pos) = self.pending.find('\n') {
            let line = self.pending[..pos].to_string();
            self.write_line(&line)?;
            self.pending.drain(..=pos);
        }
        Ok(())
    }

    /// Flushes a trailing partial line (no newline was seen) at stream end.
    pub fn finish(mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.write_line(&line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "prefix_tests.rs"]
mod tests;
