#![allow(dead_code)]

use interview_relay::config::GatewayConfig;
use interview_relay::gateway::run_gateway_with_listener;
use interview_relay::providers::{FragmentStream, Provider};
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted upstream reply. `Err` fails the stream at that point.
pub type Script = Vec<Result<&'static str, &'static str>>;

/// Fake upstream that replays one script per call and records every prompt.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    fragment_delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            ..Self::default()
        }
    }

    pub fn replying(fragments: &[&'static str]) -> Self {
        Self::new(vec![fragments.iter().map(|f| Ok(*f)).collect()])
    }

    /// Sleeps before each fragment so a reply stays in flight for a while.
    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn generate_stream<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<FragmentStream>> + Send + 'a>> {
        Box::pin(async move {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
            let delay = self.fragment_delay;
            let stream: FragmentStream = Box::pin(async_stream::stream! {
                for item in script {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    match item {
                        Ok(text) => yield Ok(text.to_string()),
                        Err(message) => {
                            yield Err(anyhow::anyhow!("{message}"));
                            return;
                        }
                    }
                }
            });
            Ok(stream)
        })
    }
}

pub struct GatewayTestServer {
    port: u16,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl GatewayTestServer {
    pub async fn start(provider: ScriptedProvider) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral gateway listener should bind");
        let port = listener
            .local_addr()
            .expect("ephemeral gateway listener should expose local address")
            .port();

        let config = GatewayConfig::default();
        let provider: Arc<dyn Provider> = Arc::new(provider);
        let handle = tokio::spawn(async move {
            run_gateway_with_listener(listener, &config, provider).await
        });

        wait_until_gateway_ready(port).await;
        Self { port, handle }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }
}

impl Drop for GatewayTestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn wait_until_gateway_ready(port: u16) {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .expect("reqwest client should be built");

    for _ in 0..80 {
        let index = client.get(format!("http://127.0.0.1:{port}/")).send().await;
        if matches!(index, Ok(resp) if resp.status() == StatusCode::OK) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("gateway did not become ready on port {port}");
}
