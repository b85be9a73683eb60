//! Google Gemini provider over the public REST API.
//!
//! Streaming uses `:streamGenerateContent?alt=sse`, which answers with the
//! same `data:` event framing the relay itself speaks, so the shared
//! [`SseBuffer`] does the splitting.

use super::gemini_types::{GenerateContentRequest, GenerateContentResponse, GenerationConfig};
use super::http_client::build_provider_client;
use super::scrub::{api_error, sanitize_api_error};
use super::traits::{FragmentStream, Provider};
use crate::config::ProviderConfig;
use crate::protocol::sse::{SseBuffer, parse_data_lines};
use anyhow::Context;
use futures_util::StreamExt;
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";
const MAX_OUTPUT_TOKENS: u32 = 8192;

pub struct GeminiProvider {
    api_key: Option<String>,
    model: String,
    temperature: f64,
    base_url: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(api_key: Option<&str>, model: &str, temperature: f64) -> Self {
        Self {
            api_key: api_key
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(String::from),
            model: model.to_string(),
            temperature,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: build_provider_client(120),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            client: build_provider_client(config.timeout_secs),
            ..Self::new(config.api_key.as_deref(), &config.model, config.temperature)
        }
        .with_base_url(&config.base_url)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn model_name(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        }
    }

    fn build_request(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest::user_text(
            prompt,
            GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        )
    }

    fn api_key(&self) -> anyhow::Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "Gemini API key not found. Set GEMINI_API_KEY or [provider] api_key in config.toml"
            )
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/{}:{method}",
            self.base_url,
            Self::model_name(&self.model)
        )
    }

    async fn post(
        &self,
        url: String,
        request: &GenerateContentRequest,
    ) -> anyhow::Result<reqwest::Response> {
        let api_key = self.api_key()?;
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(request)
            .send()
            .await
            .context("Gemini request failed")?;

        if !response.status().is_success() {
            return Err(api_error("Gemini", response).await);
        }
        Ok(response)
    }

    fn extract_text(result: &GenerateContentResponse) -> anyhow::Result<String> {
        if let Some(error) = result.error.as_ref() {
            anyhow::bail!("Gemini API error: {}", sanitize_api_error(&error.message));
        }
        if let Some(reason) = result.block_reason() {
            anyhow::bail!("Gemini blocked the prompt: {reason}");
        }
        let text: String = result.text_parts().collect();
        if text.is_empty() {
            anyhow::bail!("No response from Gemini");
        }
        Ok(text)
    }

    async fn generate_once(&self, prompt: &str) -> anyhow::Result<String> {
        let request = self.build_request(prompt);
        let response = self.post(self.endpoint("generateContent"), &request).await?;
        let result: GenerateContentResponse = response
            .json()
            .await
            .context("Gemini returned an unreadable response")?;
        Self::extract_text(&result)
    }

    async fn open_stream(&self, prompt: &str) -> anyhow::Result<FragmentStream> {
        let request = self.build_request(prompt);
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let response = self.post(url, &request).await?;
        let mut byte_stream = response.bytes_stream();

        let stream = async_stream::try_stream! {
            let mut sse_buffer = SseBuffer::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = chunk_result?;
                sse_buffer.push_chunk(&chunk);

                while let Some(event_block) = sse_buffer.next_event_block() {
                    for data in parse_data_lines(&event_block) {
                        let gen_response = match serde_json::from_str::<GenerateContentResponse>(data) {
                            Ok(parsed) => parsed,
                            Err(error) => {
                                tracing::warn!("skipping unreadable Gemini stream event: {error}");
                                continue;
                            }
                        };

                        if let Some(err) = gen_response.error.as_ref() {
                            Err(anyhow::anyhow!(
                                "Gemini API error: {}",
                                sanitize_api_error(&err.message)
                            ))?;
                        }
                        if let Some(reason) = gen_response.block_reason() {
                            Err(anyhow::anyhow!("Gemini blocked the prompt: {reason}"))?;
                        }

                        for text in gen_response.text_parts() {
                            yield text.to_string();
                        }

                        if gen_response.is_finished()
                            && let Some(usage) = gen_response.usage_metadata.as_ref()
                        {
                            tracing::debug!(
                                input_tokens = usage.prompt_token_count,
                                output_tokens = usage.candidates_token_count,
                                "Gemini stream finished"
                            );
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    fn generate_stream<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<FragmentStream>> + Send + 'a>> {
        Box::pin(self.open_stream(prompt))
    }

    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(self.generate_once(prompt))
    }
}
