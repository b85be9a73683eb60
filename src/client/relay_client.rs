use super::consumer::{ConsumerStream, consume};
use crate::config::ClientConfig;
use crate::error::StreamError;
use crate::gateway::{CHAT_STREAM_PATH, INTERVIEW_STREAM_PATH};
use crate::interview::DialogueRequest;
use crate::providers::build_stream_client;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Serialize;

/// HTTP client for a running relay gateway.
#[derive(Clone)]
pub struct RelayClient {
    http: Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: &str, read_timeout_secs: u64) -> Self {
        Self {
            http: build_stream_client(read_timeout_secs),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.relay_url, config.read_timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Streams the interviewer's reply to `request`.
    pub fn stream_interview(&self, request: &DialogueRequest) -> ConsumerStream {
        self.open(INTERVIEW_STREAM_PATH, request)
    }

    /// Streams a generic chat reply to `input`.
    pub fn stream_chat(&self, input: &str) -> ConsumerStream {
        self.open(CHAT_STREAM_PATH, &serde_json::json!({ "input": input }))
    }

    fn open<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> ConsumerStream {
        let url = format!("{}{path}", self.base_url);
        let request = self.http.post(&url).json(body);

        Box::pin(async_stream::stream! {
            tracing::debug!(%url, "opening relay stream");
            let response = match request.send().await {
                Ok(response) => response,
                Err(error) => {
                    yield Err(StreamError::Transport(error.to_string()));
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                yield Err(StreamError::Status {
                    status: status.as_u16(),
                    body: relay_error_message(&body),
                });
                return;
            }

            let mut events = Box::pin(consume(response.bytes_stream()));
            while let Some(event) = events.next().await {
                yield event;
            }
        })
    }
}

/// Pulls `error` out of a JSON error body, falling back to the raw text.
fn relay_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
