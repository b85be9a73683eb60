//! Axum-based HTTP gateway exposing the streaming relay endpoints.
//!
//! Validation failures are answered with a status code before any stream
//! is opened. Once a stream has started, every failure travels in-band as a
//! terminal error record (see [`relay`]).

mod handlers;
pub mod relay;
mod server;

pub use relay::{RelayJob, RelayKind, relay_frames, sse_response};
pub use server::{build_app, run_gateway, run_gateway_with_listener};

use crate::providers::Provider;
use std::sync::Arc;

pub const INDEX_PATH: &str = "/";
pub const TEST_PATH: &str = "/api/v1/test/";
pub const CHAT_PATH: &str = "/api/v1/chat/";
pub const CHAT_STREAM_PATH: &str = "/api/v1/chat/stream/";
pub const INTERVIEW_STREAM_PATH: &str = "/api/v1/interview/stream/";

/// Shared state for all axum handlers. Holds no per-dialogue state: the only
/// thing relays share is the stateless upstream handle.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn Provider>,
}

/// Body of the generic chat endpoints.
#[derive(Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct ChatBody {
    #[serde(default)]
    pub input: Option<String>,
}

/// Body of the interview stream endpoint.
#[derive(Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct InterviewBody {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(rename = "isFirstMessage", default)]
    pub is_first_message: bool,
}
