mod loader;
pub mod schema;

pub use schema::{ClientConfig, Config, GatewayConfig, ProviderConfig};
