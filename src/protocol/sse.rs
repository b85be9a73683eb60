/// Accumulates raw bytes from an event stream and hands back complete event
/// blocks. Bytes are kept undecoded until a block boundary is seen, so a
/// multi-byte character split across two reads is reassembled intact.
#[derive(Debug, Default)]
pub struct SseBuffer {
    buffer: Vec<u8>,
    /// Offset below which no boundary can start.
    scanned: usize,
}

impl SseBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
        }
    }

    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pops the next block terminated by a blank line (`\n\n` or `\r\n\r\n`).
    pub fn next_event_block(&mut self) -> Option<String> {
        let Some((boundary, separator_len)) = find_boundary(&self.buffer, self.scanned) else {
            // A separator may straddle two reads.
            self.scanned = self.buffer.len().saturating_sub(MAX_SEPARATOR_LEN - 1);
            return None;
        };
        let remaining = self.buffer.split_off(boundary + separator_len);
        let block = std::mem::replace(&mut self.buffer, remaining);
        self.scanned = 0;
        Some(String::from_utf8_lossy(&block).into_owned())
    }

    /// Bytes received but not yet part of a complete block.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

const MAX_SEPARATOR_LEN: usize = 4;

/// Position and length of the first blank-line separator starting at or
/// after `from`.
pub(crate) fn find_boundary(bytes: &[u8], from: usize) -> Option<(usize, usize)> {
    (from..bytes.len()).find_map(|at| {
        let rest = &bytes[at..];
        if rest.starts_with(b"\n\n") {
            Some((at, 2))
        } else if rest.starts_with(b"\r\n\r\n") {
            Some((at, 4))
        } else {
            None
        }
    })
}

/// Extracts the payload of every `data:` line in a block. Other lines are
/// dropped.
pub fn parse_data_lines(event_block: &str) -> Vec<&str> {
    event_block
        .lines()
        .filter_map(|line| {
            line.strip_prefix("data: ")
                .or_else(|| line.strip_prefix("data:"))
        })
        .collect()
}

/// Lines of a block that are neither `data:` records nor blank.
pub fn non_data_lines(event_block: &str) -> impl Iterator<Item = &str> {
    event_block
        .lines()
        .filter(|line| !line.starts_with("data:") && !line.trim().is_empty())
}
