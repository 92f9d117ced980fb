use snafu::prelude::*;
use tokio_tungstenite as websocket;

use super::{Connection, WebsocketClient};
use crate::api::{
    self,
    types::{GatewayDescriptor, ParseGatewayURLError},
    GatewaySource,
};

/// Error when connect to websocket gateway
#[derive(Debug, Snafu)]
#[snafu(
    display("connect ws gateway {url} failed: {source}"),
    visibility(pub(crate)),
    module(error),
    context(suffix(false))
)]
pub struct ConnectGatewayError {
    /// connected url
    pub url: String,
    /// source error
    pub source: websocket::tungstenite::Error,
}

/// Error when prepare a gateway from descriptor
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(bootstrap_error), context(suffix(false)))]
pub enum BootstrapError {
    /// fetch gateway descriptor failed
    #[snafu(display("fetch gateway descriptor failed: {source}"))]
    FetchDescriptorFailed {
        /// source error
        source: api::Error,
    },

    /// descriptor has an invalid gateway url
    #[snafu(display("invalid gateway url: {source}"))]
    InvalidGatewayURL {
        /// source error
        source: ParseGatewayURLError,
    },
}

/// Gateway endpoint, opens new [`Connection`]s.
#[derive(Debug, Clone)]
pub struct Gateway {
    descriptor: GatewayDescriptor,
    url: url::Url,
}

impl Gateway {
    /// Build from a fetched descriptor, its url is validated here.
    pub fn new(descriptor: GatewayDescriptor) -> Result<Self, BootstrapError> {
        let url = descriptor
            .connect_url()
            .context(bootstrap_error::InvalidGatewayURL)?;

        Ok(Self { descriptor, url })
    }

    /// Fetch descriptor from `source` and build gateway.
    pub async fn fetch<G: GatewaySource + ?Sized>(source: &G) -> Result<Self, BootstrapError> {
        log::info!("Getting gateway descriptor ...");

        let descriptor = source
            .gateway_descriptor()
            .await
            .context(bootstrap_error::FetchDescriptorFailed)?;

        log::debug!(
            "Got gateway {}, shards {}, session start limit {:?}",
            descriptor.url,
            descriptor.shards,
            descriptor.session_start_limit
        );

        Self::new(descriptor)
    }

    /// descriptor this gateway built from
    pub fn descriptor(&self) -> &GatewayDescriptor {
        &self.descriptor
    }

    /// final websocket url, with protocol query
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Open websocket to gateway, without retry.
    pub async fn connect(&self) -> Result<Connection<WebsocketClient>, ConnectGatewayError> {
        log::debug!("Connecting gateway: {}", self.url);

        let (ws, _) = websocket::connect_async(&self.url)
            .await
            .with_context(|_| error::ConnectGateway {
                url: self.url.as_str(),
            })?;

        log::debug!("Gateway connected");

        Ok(Connection::new(ws))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::types::SessionStartLimit;

    struct FixedSource(String);

    #[async_trait::async_trait]
    impl GatewaySource for FixedSource {
        async fn gateway_descriptor(&self) -> api::Result<GatewayDescriptor> {
            Ok(GatewayDescriptor {
                url: self.0.clone(),
                shards: 1,
                session_start_limit: SessionStartLimit {
                    total: 1000,
                    remaining: 1000,
                    reset_after: 0,
                    max_concurrency: 1,
                },
            })
        }
    }

    #[tokio::test]
    async fn test_gateway_fetch() {
        let gateway = Gateway::fetch(&FixedSource("wss://gateway.discord.gg".into()))
            .await
            .unwrap();

        assert_eq!(gateway.descriptor().shards, 1);
        assert_eq!(
            gateway.url().as_str(),
            "wss://gateway.discord.gg/?v=10&encoding=json"
        );
    }

    #[tokio::test]
    async fn test_gateway_fetch_invalid_url() {
        let err = Gateway::fetch(&FixedSource("http://example.com".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, BootstrapError::InvalidGatewayURL { .. }));
    }

    #[tokio::test]
    async fn test_gateway_connect_refused() {
        // bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gateway = Gateway::fetch(&FixedSource(format!("ws://{}", addr)))
            .await
            .unwrap();

        let err = gateway.connect().await.unwrap_err();
        assert!(err.url.starts_with(&format!("ws://{}", addr)));
    }
}
