//! Relay transport: turns one upstream generation into a live event stream.
//!
//! A relay always produces zero or more `Chunk` records followed by exactly
//! one terminal record. Failures after the headers are committed are never
//! reported through the status code; they become an in-band `Error` record.

use crate::interview::DialogueRequest;
use crate::protocol::{FrameRecord, StreamFrame, encode};
use crate::providers::{Provider, sanitize_api_error};
use axum::body::Body;
use axum::http::{HeaderValue, Response, StatusCode, header};
use futures_util::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;

const PROMPT_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    Chat,
    Interview,
}

impl RelayKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Interview => "interview",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Self::Chat => "Failed to generate AI response",
            Self::Interview => "Failed to generate interview response",
        }
    }
}

/// One validated relay request.
#[derive(Debug, Clone)]
pub struct RelayJob {
    pub kind: RelayKind,
    pub prompt: String,
    /// Context tag mirrored into every record, when the caller supplied one.
    pub is_first_message: Option<bool>,
}

impl RelayJob {
    pub fn chat(input: String) -> Self {
        Self {
            kind: RelayKind::Chat,
            prompt: input,
            is_first_message: None,
        }
    }

    pub fn interview(prompt: String, is_first_message: bool) -> Self {
        Self {
            kind: RelayKind::Interview,
            prompt,
            is_first_message: Some(is_first_message),
        }
    }
}

impl From<DialogueRequest> for RelayJob {
    fn from(request: DialogueRequest) -> Self {
        Self::interview(request.prompt, request.is_first_turn)
    }
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(PROMPT_PREVIEW_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Streams the records of one relay. Empty upstream fragments are dropped;
/// nothing is emitted after the terminal record.
pub fn relay_frames(
    provider: Arc<dyn Provider>,
    job: RelayJob,
) -> impl Stream<Item = FrameRecord> + Send + 'static {
    async_stream::stream! {
        let request_id = uuid::Uuid::new_v4();
        let tag = job.is_first_message;
        tracing::info!(
            %request_id,
            kind = job.kind.as_str(),
            provider = provider.name(),
            first_turn = ?tag,
            prompt_chars = job.prompt.chars().count(),
            "relay stream opened"
        );
        tracing::debug!(%request_id, prompt = preview(&job.prompt), "relay prompt preview");

        let mut chunks = 0usize;
        let terminal = match provider.generate_stream(&job.prompt).await {
            Err(error) => {
                tracing::error!(%request_id, "upstream stream failed to open: {error:#}");
                StreamFrame::Error(format!(
                    "{}: {}",
                    job.kind.failure_message(),
                    sanitize_api_error(&format!("{error:#}"))
                ))
            }
            Ok(mut fragments) => loop {
                match fragments.next().await {
                    Some(Ok(text)) => {
                        if text.is_empty() {
                            continue;
                        }
                        chunks += 1;
                        tracing::debug!(%request_id, chunk = chunks, chars = text.len(), "relayed chunk");
                        yield FrameRecord::new(StreamFrame::Chunk(text), tag);
                    }
                    Some(Err(error)) => {
                        tracing::error!(%request_id, chunks, "upstream failed mid-stream: {error:#}");
                        break StreamFrame::Error(format!(
                            "{}: {}",
                            job.kind.failure_message(),
                            sanitize_api_error(&format!("{error:#}"))
                        ));
                    }
                    None => break StreamFrame::Done,
                }
            },
        };

        if terminal == StreamFrame::Done {
            tracing::info!(%request_id, chunks, "relay stream completed");
        }
        yield FrameRecord::new(terminal, tag);
    }
}

/// Wraps encoded records in a `text/event-stream` response. The body closes
/// once, when `records` is exhausted.
pub fn sse_response<S>(records: S) -> Response<Body>
where
    S: Stream<Item = FrameRecord> + Send + 'static,
{
    let body = records.map(|record| Ok::<_, Infallible>(encode(&record)));

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Cache-Control"),
    );
    response
}
