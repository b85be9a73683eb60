use reqwest::Client;
use std::time::Duration;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Client for upstream generation calls. `timeout_secs` bounds the whole
/// call, streaming body included.
pub fn build_provider_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|error| {
            tracing::warn!("falling back to default provider HTTP client: {error}");
            Client::new()
        })
}

/// Client for reading relay streams. Only the gap between two reads is
/// bounded, so a long but live stream is never cut off.
pub fn build_stream_client(read_timeout_secs: u64) -> Client {
    Client::builder()
        .read_timeout(Duration::from_secs(read_timeout_secs.max(1)))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|error| {
            tracing::warn!("falling back to default relay HTTP client: {error}");
            Client::new()
        })
}
