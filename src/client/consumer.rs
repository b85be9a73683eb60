//! Folds a relay byte stream into a single growing message.

use crate::error::StreamError;
use crate::protocol::{FrameDecoder, StreamFrame};
use futures_util::{Stream, StreamExt};
use std::fmt::Display;
use std::pin::Pin;

/// What the consumer reports to its caller. Updates carry the whole message
/// accumulated so far, never a delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerEvent {
    Update { text: String },
    Completed { text: String },
    Failed { message: String },
}

impl ConsumerEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Update { .. })
    }
}

pub type ConsumerStream = Pin<Box<dyn Stream<Item = Result<ConsumerEvent, StreamError>> + Send>>;

#[derive(Debug, Default)]
pub struct MessageAccumulator {
    text: String,
    finished: bool,
}

impl MessageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Applies one frame. Empty chunks and anything after a terminal frame
    /// produce no event.
    pub fn fold(&mut self, frame: StreamFrame) -> Option<ConsumerEvent> {
        if self.finished {
            return None;
        }
        match frame {
            StreamFrame::Chunk(text) if text.is_empty() => None,
            StreamFrame::Chunk(text) => {
                self.text.push_str(&text);
                Some(ConsumerEvent::Update {
                    text: self.text.clone(),
                })
            }
            StreamFrame::Done => {
                self.finished = true;
                Some(ConsumerEvent::Completed {
                    text: self.text.clone(),
                })
            }
            StreamFrame::Error(message) => {
                self.finished = true;
                Some(ConsumerEvent::Failed { message })
            }
        }
    }
}

/// Reads `source` until a terminal frame. Every call starts from an empty
/// accumulator. A read failure, or end of input before a terminal frame, is
/// reported as a [`StreamError`] rather than a `Failed` event.
pub fn consume<S, B, E>(source: S) -> impl Stream<Item = Result<ConsumerEvent, StreamError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    async_stream::stream! {
        let mut source = Box::pin(source);
        let mut decoder = FrameDecoder::new();
        let mut accumulator = MessageAccumulator::new();
        let mut reads = 0usize;

        while let Some(read) = source.next().await {
            let bytes = match read {
                Ok(bytes) => bytes,
                Err(error) => {
                    let message = error.to_string();
                    tracing::warn!(reads, "relay stream read failed: {message}");
                    yield Err(StreamError::Transport(message));
                    return;
                }
            };
            reads += 1;

            for record in decoder.push(bytes.as_ref()) {
                if let Some(event) = accumulator.fold(record.frame) {
                    let terminal = event.is_terminal();
                    yield Ok(event);
                    if terminal {
                        return;
                    }
                }
            }
        }

        tracing::warn!(
            reads,
            partial = decoder.has_partial(),
            received_chars = accumulator.text().chars().count(),
            "relay stream closed without a terminal record"
        );
        yield Err(StreamError::Truncated);
    }
}
