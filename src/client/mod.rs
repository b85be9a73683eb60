//! Client side of the relay: HTTP access to a gateway and the consumer that
//! turns its byte stream into message events.

mod consumer;
mod relay_client;

pub use consumer::{ConsumerEvent, ConsumerStream, MessageAccumulator, consume};
pub use relay_client::RelayClient;
