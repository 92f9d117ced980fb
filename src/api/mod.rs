//! Discord HTTP api, only the parts a gateway bot needs

mod client;
mod error;
pub mod types;

pub use client::Client;
pub use error::Error;

use types::GatewayDescriptor;

/// Result type for api module
pub type Result<T> = std::result::Result<T, Error>;

/// Source of the gateway descriptor used to open a connection.
#[async_trait::async_trait]
pub trait GatewaySource: Send + Sync {
    /// fetch gateway url, shard count and session start limit
    async fn gateway_descriptor(&self) -> Result<GatewayDescriptor>;
}

/// Something can send a text message to a channel.
#[async_trait::async_trait]
pub trait TextSender: Send + Sync {
    /// send `content` to channel `channel_id`
    async fn send_text(&self, channel_id: &str, content: &str) -> Result<()>;
}
