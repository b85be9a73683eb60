//! Line-oriented event-stream protocol shared by the relay and its consumers.

pub mod frame;
pub mod sse;

pub use frame::{FrameDecoder, FrameRecord, StreamFrame, decode, decode_payload, encode};
pub use sse::{SseBuffer, parse_data_lines};
