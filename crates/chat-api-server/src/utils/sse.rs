//! Server-sent event helpers.
//!
//! Downstream, every text fragment is written as `data: <fragment>\n\n` with no
//! other fields, ids or keep-alive comments. Upstream, completion endpoints
//! deliver `data:` lines that may be split across arbitrary network chunks,
//! so [`SseLineDecoder`] buffers until a full line is available.

use bytes::Bytes;

pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream;charset=UTF-8";

const DONE_MARKER: &str = "[DONE]";

/// Render one fragment as an event-stream frame.
pub fn event_frame(fragment: &str) -> Bytes {
    let mut frame = String::with_capacity(fragment.len() + 8);
    frame.push_str("data: ");
    frame.push_str(fragment);
    frame.push_str("\n\n");
    Bytes::from(frame)
}

/// Payload extracted from one upstream `data:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsePayload {
    Data(String),
    Done,
}

#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every `data:` payload completed by them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SsePayload> {
        self.buffer.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(payload) = Self::parse_line(&line) {
                out.push(payload);
            }
        }
        out
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<SsePayload> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        Self::parse_line(&line)
    }

    fn parse_line(raw: &[u8]) -> Option<SsePayload> {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\r', '\n']);

        let data = line.strip_prefix("data:")?;
        let data = data.strip_prefix(' ').unwrap_or(data);

        if data == DONE_MARKER {
            Some(SsePayload::Done)
        } else if data.is_empty() {
            None
        } else {
            Some(SsePayload::Data(data.to_string()))
        }
    }
}
