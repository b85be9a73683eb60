use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

// ─── Gateway request validation ─────────────────────────────────────────────

/// Rejections raised before any streaming I/O starts. These are the only
/// failures reported through an HTTP status.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Missing '{0}' in request body")]
    MissingField(&'static str),

    #[error("Invalid JSON body: {0}")]
    InvalidBody(String),
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

// ─── Wire decoding ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FrameDecodeError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record carries neither chunk, error nor done")]
    Unrecognized,
}

// ─── Client transport ───────────────────────────────────────────────────────

/// Local failures of a relay stream, distinct from in-band error records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("relay responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("relay connection failed: {0}")]
    Transport(String),

    #[error("relay stream ended before a terminal record")]
    Truncated,
}

// ─── Turn controller ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TurnRejection {
    #[error("input is empty")]
    EmptyInput,

    #[error("a reply is still streaming")]
    InFlight,

    #[error("no interview has been started")]
    NoInterview,

    #[error("handle does not address the in-progress reply")]
    StaleHandle,

    #[error("no turn is waiting for a relay call")]
    NotAwaitingTurn,

    #[error("a turn is already waiting for its relay call")]
    TurnPending,
}
