use super::relay::{RelayJob, relay_frames, sse_response};
use super::{
    AppState, CHAT_PATH, CHAT_STREAM_PATH, ChatBody, INTERVIEW_STREAM_PATH, InterviewBody,
    TEST_PATH,
};
use crate::error::RequestError;
use crate::providers::sanitize_api_error;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use std::sync::Arc;

const CONNECTION_TEST_PROMPT: &str = "Tell the user 'Congratulations! You've found the AI Mock \
Interviewer relay!'. Add flair and excitement to the message.";

fn required(value: Option<String>, field: &'static str) -> Result<String, RequestError> {
    value
        .filter(|text| !text.trim().is_empty())
        .ok_or(RequestError::MissingField(field))
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, RequestError> {
    body.map(|Json(inner)| inner)
        .map_err(|rejection| RequestError::InvalidBody(rejection.body_text()))
}

fn generation_failed(error: &anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": "Failed to generate AI response",
            "details": sanitize_api_error(&format!("{error:#}")),
        })),
    )
        .into_response()
}

/// GET / — liveness plus the endpoint list
pub(super) async fn handle_index(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Interview relay is running",
        "status": "ok",
        "provider": state.provider.name(),
        "credentials": state.provider.has_credentials(),
        "endpoints": {
            "test": format!("GET {TEST_PATH}"),
            "chat": format!("POST {CHAT_PATH}"),
            "chatStream": format!("POST {CHAT_STREAM_PATH}"),
            "interviewStream": format!("POST {INTERVIEW_STREAM_PATH}"),
        },
    }))
}

/// GET /api/v1/test/ — one canned, non-streaming generation
pub(super) async fn handle_test(State(state): State<AppState>) -> Response {
    tracing::info!("testing upstream connection");
    match state.provider.generate(CONNECTION_TEST_PROMPT).await {
        Ok(output) => Json(serde_json::json!({ "output": output })).into_response(),
        Err(error) => {
            tracing::error!("upstream connection test failed: {error:#}");
            generation_failed(&error)
        }
    }
}

/// POST /api/v1/chat/ — whole-response chat
pub(super) async fn handle_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Response, RequestError> {
    let input = required(parse_body(body)?.input, "input")?;
    tracing::info!(input_chars = input.chars().count(), "processing chat request");

    Ok(match state.provider.generate(&input).await {
        Ok(output) => Json(serde_json::json!({ "output": output })).into_response(),
        Err(error) => {
            tracing::error!("chat generation failed: {error:#}");
            generation_failed(&error)
        }
    })
}

/// POST /api/v1/chat/stream/ — streaming chat relay
pub(super) async fn handle_chat_stream(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Response, RequestError> {
    let input = required(parse_body(body)?.input, "input")?;
    let frames = relay_frames(Arc::clone(&state.provider), RelayJob::chat(input));
    Ok(sse_response(frames))
}

/// POST /api/v1/interview/stream/ — streaming interview relay
pub(super) async fn handle_interview_stream(
    State(state): State<AppState>,
    body: Result<Json<InterviewBody>, JsonRejection>,
) -> Result<Response, RequestError> {
    let body = parse_body(body)?;
    let prompt = required(body.prompt, "prompt")?;
    let job = RelayJob::interview(prompt, body.is_first_message);
    Ok(sse_response(relay_frames(Arc::clone(&state.provider), job)))
}
