//! Server-Sent Events line handling.
//!
//! [`LineDecoder`] buffers raw body bytes and yields complete lines, so a
//! line split across network chunks (even inside a multi-byte UTF-8 sequence)
//! is decoded only once it is whole. [`classify_line`] then decides what a
//! line means for the completion stream.

use super::protocol::ChatCompletionChunk;
use tracing::trace;

/// Incremental `\n`-delimited line decoder over raw bytes.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from the body. Returns every line completed by them,
    /// without the terminator (a trailing `\r` is stripped too).
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            lines.push(decode_line(&self.buffer[start..end]));
            start = end + 1;
        }
        self.buffer.drain(..start);
        lines
    }

    /// The final unterminated line, if the body did not end with `\n`.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = decode_line(&self.buffer);
        self.buffer.clear();
        Some(line)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Meaning of one body line
#[derive(Debug, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// Blank lines, comments, `event:`/`id:` fields and anything else.
    Ignored,
    /// `data: [DONE]`
    Done,
    /// The payload after `data: `
    Data(&'a str),
}

pub fn classify_line(line: &str) -> SseLine<'_> {
    match line.strip_prefix("data: ") {
        None => SseLine::Ignored,
        Some("[DONE]") => SseLine::Done,
        Some(payload) => SseLine::Data(payload),
    }
}

/// Text carried by a `data:` payload.
///
/// Malformed payloads and chunks without content (role announcements, usage
/// records, finish markers) yield `None`.
pub fn delta_text(payload: &str) -> Option<String> {
    match serde_json::from_str::<ChatCompletionChunk>(payload) {
        Ok(chunk) => chunk.into_delta_text().filter(|text| !text.is_empty()),
        Err(e) => {
            trace!("Skipping malformed chunk: {}", e);
            None
        }
    }
}
