use futures_util::{Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;

/// Text fragments of one generation, in arrival order. The stream ends when
/// the upstream is exhausted; an `Err` item is a failure and ends it early.
pub type FragmentStream = Pin<Box<dyn Stream<Item = anyhow::Result<String>> + Send + 'static>>;

/// The upstream text-generation capability. Injected into the gateway so
/// relays can be exercised against scripted fakes.
pub trait Provider: Send + Sync {
    /// Provider identifier used in logs (e.g. "gemini").
    fn name(&self) -> &str;

    /// False when calls are certain to fail for lack of a credential.
    fn has_credentials(&self) -> bool {
        true
    }

    /// Opens a streaming generation for `prompt`.
    fn generate_stream<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<FragmentStream>> + Send + 'a>>;

    /// Whole-response generation. Defaults to draining the stream.
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let mut stream = self.generate_stream(prompt).await?;
            let mut text = String::new();
            while let Some(fragment) = stream.next().await {
                text.push_str(&fragment?);
            }
            Ok(text)
        })
    }
}
