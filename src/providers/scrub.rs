use std::borrow::Cow;

const MAX_API_ERROR_CHARS: usize = 240;
const REDACTED: &str = "[REDACTED]";
const SECRET_MARKERS: [&str; 4] = ["key=", "api_key=", "\"x-goog-api-key\":", "Bearer "];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn token_end(input: &str, from: usize) -> usize {
    input[from..]
        .char_indices()
        .find(|(_, c)| !is_secret_char(*c))
        .map_or(input.len(), |(i, _)| from + i)
}

fn redact_after(scrubbed: &mut String, marker: &str) {
    let mut search_from = 0;
    while let Some(rel) = scrubbed[search_from..].find(marker) {
        let content_start = search_from + rel + marker.len();
        let end = token_end(scrubbed, content_start);
        if end == content_start {
            search_from = content_start;
            continue;
        }
        scrubbed.replace_range(content_start..end, REDACTED);
        search_from = content_start + REDACTED.len();
    }
}

/// Masks credential-looking tokens that upstream error bodies sometimes echo.
pub fn scrub_secret_patterns(input: &str) -> Cow<'_, str> {
    if !SECRET_MARKERS.iter().any(|marker| input.contains(marker)) {
        return Cow::Borrowed(input);
    }
    let mut scrubbed = input.to_string();
    for marker in SECRET_MARKERS {
        redact_after(&mut scrubbed, marker);
    }
    Cow::Owned(scrubbed)
}

/// Scrubs and truncates an upstream error so it is safe to put on the wire.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);
    match scrubbed.char_indices().nth(MAX_API_ERROR_CHARS) {
        Some((end, _)) => format!("{}...", &scrubbed[..end]),
        None => scrubbed.into_owned(),
    }
}

/// Builds a sanitized provider error from a failed HTTP response.
pub async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    anyhow::anyhow!("{provider} API error ({status}): {}", sanitize_api_error(&body))
}
