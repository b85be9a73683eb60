use crate::cli::{Cli, Commands, run_chat, run_interview};
use crate::client::RelayClient;
use crate::config::{ClientConfig, Config};
use crate::gateway::run_gateway;
use crate::providers::{GeminiProvider, Provider};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

fn relay_client(config: &ClientConfig, relay_url: Option<String>) -> RelayClient {
    match relay_url {
        Some(url) => RelayClient::new(&url, config.read_timeout_secs),
        None => RelayClient::from_config(config),
    }
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Serve { port, host } => {
            let mut gateway = config.gateway.clone();
            if let Some(port) = port {
                gateway.port = port;
            }
            if let Some(host) = host {
                gateway.host = host;
            }

            let provider = GeminiProvider::from_config(&config.provider);
            info!(
                model = provider.model(),
                config = %config.config_path.display(),
                "starting interview relay"
            );
            let provider: Arc<dyn Provider> = Arc::new(provider);
            run_gateway(&gateway, provider).await
        }
        Commands::Interview { job, relay_url } => {
            run_interview(relay_client(&config.client, relay_url), job).await
        }
        Commands::Chat { message, relay_url } => {
            run_chat(relay_client(&config.client, relay_url), &message).await
        }
    }
}
