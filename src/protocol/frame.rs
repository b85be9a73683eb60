//! Wire codec for relay records.
//!
//! Every record is one `data: <json>\n\n` event. The JSON object is one of
//! `{"chunk": "...", "done": false}`, `{"chunk": "", "done": true}` or
//! `{"error": "...", "done": true}`, optionally carrying `isFirstMessage`
//! mirrored from the originating request.

use super::sse::{SseBuffer, find_boundary, non_data_lines, parse_data_lines};
use crate::error::FrameDecodeError;
use serde::{Deserialize, Serialize};

const DATA_PREFIX: &str = "data: ";
const RECORD_TERMINATOR: &str = "\n\n";
const PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Chunk(String),
    Done,
    Error(String),
}

impl StreamFrame {
    pub fn chunk(text: impl Into<String>) -> Self {
        Self::Chunk(text.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// `Done` and `Error` end a stream; nothing may follow them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

/// A frame plus the pass-through context tag of the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    pub frame: StreamFrame,
    pub is_first_message: Option<bool>,
}

impl FrameRecord {
    pub fn new(frame: StreamFrame, is_first_message: Option<bool>) -> Self {
        Self {
            frame,
            is_first_message,
        }
    }

    pub fn untagged(frame: StreamFrame) -> Self {
        Self::new(frame, None)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chunk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing)]
    details: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(
        rename = "isFirstMessage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    is_first_message: Option<bool>,
}

impl From<&FrameRecord> for WireRecord {
    fn from(record: &FrameRecord) -> Self {
        let (chunk, error, done) = match &record.frame {
            StreamFrame::Chunk(text) => (Some(text.clone()), None, false),
            StreamFrame::Done => (Some(String::new()), None, true),
            StreamFrame::Error(message) => (None, Some(message.clone()), true),
        };
        Self {
            chunk,
            error,
            details: None,
            done,
            is_first_message: record.is_first_message,
        }
    }
}

/// Serializes one record as a self-delimited `data:` event.
pub fn encode(record: &FrameRecord) -> String {
    let json = serde_json::to_string(&WireRecord::from(record))
        .unwrap_or_else(|_| r#"{"error":"serialization failed","done":true}"#.to_string());
    format!("{DATA_PREFIX}{json}{RECORD_TERMINATOR}")
}

/// Decodes the JSON payload of a single `data:` line.
pub fn decode_payload(payload: &str) -> Result<FrameRecord, FrameDecodeError> {
    let wire: WireRecord = serde_json::from_str(payload)?;
    let frame = if let Some(error) = wire.error {
        match wire.details.filter(|details| !details.is_empty()) {
            Some(details) => StreamFrame::Error(format!("{error}: {details}")),
            None => StreamFrame::Error(error),
        }
    } else if wire.done {
        StreamFrame::Done
    } else if let Some(chunk) = wire.chunk {
        StreamFrame::Chunk(chunk)
    } else {
        return Err(FrameDecodeError::Unrecognized);
    };
    Ok(FrameRecord::new(frame, wire.is_first_message))
}

/// Decodes every complete record in `buffer` and returns the undecoded tail.
pub fn decode(buffer: &str) -> (Vec<FrameRecord>, &str) {
    let mut records = Vec::new();
    let mut rest = buffer;
    while let Some((boundary, separator_len)) = find_boundary(rest.as_bytes(), 0) {
        records.extend(decode_block(&rest[..boundary]));
        rest = &rest[boundary + separator_len..];
    }
    (records, rest)
}

fn decode_block(block: &str) -> Vec<FrameRecord> {
    for line in non_data_lines(block) {
        tracing::debug!(line, "ignoring non-data line in relay stream");
    }

    parse_data_lines(block)
        .into_iter()
        .filter_map(|payload| match decode_payload(payload) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!(
                    payload = preview(payload),
                    "skipping malformed relay record: {error}"
                );
                None
            }
        })
        .collect()
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Incremental decoder fed with raw reads of arbitrary size.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: SseBuffer,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: SseBuffer::new(),
        }
    }

    /// Appends a read and returns every record it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<FrameRecord> {
        self.buffer.push_chunk(chunk);
        let mut records = Vec::new();
        while let Some(block) = self.buffer.next_event_block() {
            records.extend(decode_block(&block));
        }
        records
    }

    /// True when bytes of an unfinished record are still buffered.
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty()
    }
}
