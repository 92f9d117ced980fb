//! Discord HTTP API response types

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// gateway protocol version used in connect url
pub const GATEWAY_VERSION: u8 = 10;

/// Error body returned by api when request failed
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    /// discord json error code
    pub code: i64,
    /// error message
    pub message: String,
}

/// data type for api /gateway/bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayDescriptor {
    /// gateway url, without protocol query
    pub url: String,
    /// recommended shard count
    pub shards: u32,
    /// identify rate limit of the bot
    pub session_start_limit: SessionStartLimit,
}

/// Session start limit of a bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStartLimit {
    /// total number of session starts allowed
    pub total: u32,
    /// remaining number of session starts
    pub remaining: u32,
    /// milliseconds until the limit resets
    pub reset_after: u64,
    /// number of identify requests allowed per 5 seconds
    pub max_concurrency: u32,
}

/// Parse string as gateway url error
#[derive(Debug, Snafu)]
#[snafu(
    visibility(pub(crate)),
    module(parse_gateway_url_error_variant),
    context(suffix(false))
)]
pub enum ParseGatewayURLError {
    #[snafu(display("{s} is an invalid url: {source}"))]
    /// the str is not a valid url
    InvalidURL {
        /// string be parsed
        s: String,
        /// source error
        source: url::ParseError,
    },

    /// the parsed url schema is not websocket
    #[snafu(display("the url {s} has invalid schema {schema}, only ws or wss is ok"))]
    InvalidSchema {
        /// the url
        s: String,
        /// invalid schema
        schema: String,
    },

    /// the parsed url has no host
    #[snafu(display("the gateway url {s} has no host"))]
    NoHost {
        /// the url
        s: String,
    },
}

impl GatewayDescriptor {
    /// construct final url, with protocol version and encoding query
    pub fn connect_url(&self) -> Result<url::Url, ParseGatewayURLError> {
        let s = self.url.as_str();

        let mut url = url::Url::parse(s)
            .with_context(|_| parse_gateway_url_error_variant::InvalidURL { s })?;

        ensure!(
            url.scheme() == "wss" || url.scheme() == "ws",
            parse_gateway_url_error_variant::InvalidSchema {
                s,
                schema: url.scheme(),
            }
        );

        ensure!(
            url.host().is_some(),
            parse_gateway_url_error_variant::NoHost { s }
        );

        url.query_pairs_mut()
            .append_pair("v", &GATEWAY_VERSION.to_string())
            .append_pair("encoding", "json");

        Ok(url)
    }
}

/// data type for api /channels/{channel.id}/messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// message id
    pub id: String,
    /// channel the message was sent in
    pub channel_id: String,
    /// message text
    #[serde(default)]
    pub content: String,
}

#[cfg(test)]
mod test {
    use super::*;

    fn descriptor(url: &str) -> GatewayDescriptor {
        GatewayDescriptor {
            url: url.to_string(),
            shards: 1,
            session_start_limit: SessionStartLimit {
                total: 1000,
                remaining: 999,
                reset_after: 14400000,
                max_concurrency: 1,
            },
        }
    }

    #[test]
    fn test_descriptor_deserialize() {
        let body = r#"{
            "url": "wss://gateway.discord.gg",
            "shards": 9,
            "session_start_limit": {
                "total": 1000,
                "remaining": 999,
                "reset_after": 14400000,
                "max_concurrency": 1
            }
        }"#;

        let d: GatewayDescriptor = serde_json::from_str(body).unwrap();
        assert_eq!(d.shards, 9);
        assert_eq!(d.session_start_limit.remaining, 999);
    }

    #[test]
    fn test_connect_url() {
        let url = descriptor("wss://gateway.discord.gg").connect_url().unwrap();
        assert_eq!(url.as_str(), "wss://gateway.discord.gg/?v=10&encoding=json");

        let url = descriptor("ws://127.0.0.1:7777/gw").connect_url().unwrap();
        assert_eq!(url.port(), Some(7777));
        assert_eq!(url.query(), Some("v=10&encoding=json"));
    }

    #[test]
    fn test_connect_url_invalid() {
        assert!(matches!(
            descriptor("not a url").connect_url(),
            Err(ParseGatewayURLError::InvalidURL { .. })
        ));
        assert!(matches!(
            descriptor("https://discord.com").connect_url(),
            Err(ParseGatewayURLError::InvalidSchema { .. })
        ));
    }
}
