//! Line buffering shared by every upstream framing family.
//!
//! Network reads arrive at arbitrary boundaries: one protocol line can be
//! split across reads, or several lines can arrive in one read. The
//! [`ChunkDecoder`] accumulates raw bytes, hands each complete line to a
//! family-specific [`LineInterpreter`], and keeps the incomplete tail for the
//! next read. Splitting happens on the `\n` byte, so UTF-8 sequences split
//! across reads are reassembled before a line is decoded.

use serde_json::Value;
use tracing::{debug, warn};

use super::events::NormalizedEvent;

/// Turns one complete line of a backend's stream into zero or more events.
pub trait LineInterpreter: Send {
    /// Short label used in log messages.
    fn family(&self) -> &'static str;

    /// Appends the events for `line` to `out`. The line never contains the
    /// trailing `\n` or `\r`, and is never blank.
    fn interpret(&self, line: &str, out: &mut Vec<NormalizedEvent>);
}

/// Per-stream decoder state: the bytes read but not yet resolved into a line.
#[derive(Debug, Default)]
pub struct ChunkDecoder<I> {
    buffer: Vec<u8>,
    interpreter: I,
    finished: bool,
}

impl<I: LineInterpreter> ChunkDecoder<I> {
    #[must_use]
    pub fn new(interpreter: I) -> Self {
        Self {
            buffer: Vec::new(),
            interpreter,
            finished: false,
        }
    }

    /// Feeds one network chunk and returns every event it completes.
    ///
    /// Processing stops at the first terminal-class event; later lines and
    /// later calls produce nothing.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<NormalizedEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }

        self.buffer.extend_from_slice(chunk);

        let Some(last_newline) = self.buffer.iter().rposition(|b| *b == b'\n') else {
            return events;
        };
        let tail = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);

        for line in complete.split(|b| *b == b'\n') {
            self.interpret_line(line, &mut events);
            if self.finished {
                self.buffer.clear();
                break;
            }
        }

        events
    }

    /// Flushes the decoder once the network stream has ended.
    ///
    /// An unterminated trailing fragment is interpreted as a final line. A
    /// body that ends without any completion signal still counts as a normal
    /// end of generation.
    pub fn close(&mut self) -> Vec<NormalizedEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }

        let tail = std::mem::take(&mut self.buffer);
        self.interpret_line(&tail, &mut events);

        if !self.finished {
            warn!(
                family = self.interpreter.family(),
                "Upstream stream ended without a completion signal; treating as completed"
            );
            events.push(NormalizedEvent::Terminal);
            self.finished = true;
        }

        events
    }

    /// Returns `true` once a terminal-class event has been produced.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes held back waiting for the rest of their line.
    #[must_use]
    pub fn remaining_buffer(&self) -> &[u8] {
        &self.buffer
    }

    fn interpret_line(&mut self, raw: &[u8], events: &mut Vec<NormalizedEvent>) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        if raw.iter().all(u8::is_ascii_whitespace) {
            return;
        }

        let Ok(line) = std::str::from_utf8(raw) else {
            debug!(
                family = self.interpreter.family(),
                "Skipping line with invalid UTF-8"
            );
            return;
        };

        let start = events.len();
        self.interpreter.interpret(line, events);

        if let Some(offset) = events[start..].iter().position(NormalizedEvent::is_terminal) {
            events.truncate(start + offset + 1);
            self.finished = true;
        }
    }
}

/// Extracts an explicit error carried inside an upstream payload.
///
/// Backends report errors either as a string (`{"error": "model not found"}`)
/// or as an object with a message (`{"error": {"message": "..."}}`).
pub(crate) fn extract_error_message(json: &Value) -> Option<String> {
    let error = json.get("error")?;
    if let Some(msg) = error.as_str() {
        return Some(msg.to_string());
    }
    if let Some(msg) = error.get("message").and_then(Value::as_str) {
        return Some(msg.to_string());
    }
    if error.is_null() {
        return None;
    }
    Some(error.to_string())
}
