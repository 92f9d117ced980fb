use reqwest::Method;
use snafu::prelude::*;

use super::error::variant::*;
use super::types::*;
use super::{GatewaySource, Result, TextSender};

static BASE_URL: &str = "https://discord.com/api/v10";

static APP_USER_AGENT: &str = concat!(
    "DiscordBot (",
    env!("CARGO_PKG_NAME"),
    ", ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Discord HTTP API Client
#[derive(Debug, Clone)]
pub struct Client {
    client: reqwest::Client,
    base_url: String,
}

impl Client {
    fn new<S: AsRef<str> + ?Sized>(auth_type: &'static str, token: &S) -> Result<Self> {
        let token = token.as_ref();
        let mut auth_header_value: reqwest::header::HeaderValue =
            format!("{} {}", auth_type, token)
                .parse()
                .map_err(|_| TokenInvalid.build())?;
        auth_header_value.set_sensitive(true);

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::AUTHORIZATION, auth_header_value);

        let client = reqwest::Client::builder()
            .gzip(true)
            .deflate(true)
            .user_agent(APP_USER_AGENT)
            .default_headers(headers)
            .build()
            .context(ClientCreateFailed)?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    /// create a new api client using bot token
    pub fn new_from_bot_token<S: AsRef<str> + ?Sized>(token: &S) -> Result<Self> {
        Self::new("Bot", token)
    }

    /// create a new api client using oauth2 token
    pub fn new_from_oauth2_token<S: AsRef<str> + ?Sized>(token: &S) -> Result<Self> {
        Self::new("Bearer", token)
    }

    /// use another api base url, like a local mock server
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn request<R, P>(
        &self,
        method: Method,
        path: &P,
        body: Option<serde_json::Value>,
    ) -> Result<R>
    where
        P: AsRef<str> + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path.as_ref());
        let mut req = self.client.request(method.clone(), &url);

        if let Some(body) = body {
            let text = serde_json::to_string(&body).context(EncodeBodyFailed)?;
            req = req
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(text);
        }

        let req = req.build().context(BuildRequestFailed)?;

        log::trace!("Request {} {}", method, url);

        let resp = self
            .client
            .execute(req)
            .await
            .with_context(|_| RequestFailed {
                method: method.clone(),
                url: &url,
            })?;

        let status_code = resp.status();

        let body = resp.bytes().await.with_context(|_| RequestFailed {
            method: method.clone(),
            url: &url,
        })?;

        if !status_code.is_success() {
            log::debug!("Request {} {} got status {}", method, url, status_code);

            return match serde_json::from_slice::<ErrorBody>(&body) {
                Ok(err) => DiscordRejected {
                    status_code,
                    code: err.code,
                    message: err.message,
                }
                .fail(),
                Err(_) => HTTPStatusNotOK {
                    method,
                    url,
                    status_code,
                }
                .fail(),
            };
        }

        serde_json::from_slice(&body).with_context(|_| ParseBodyFailed { body })
    }

    /// Call GET /gateway/bot, get gateway descriptor
    pub async fn gateway_descriptor(&self) -> Result<GatewayDescriptor> {
        self.request(Method::GET, "/gateway/bot", None).await
    }

    /// Call POST /channels/{channel.id}/messages, send a text message
    pub async fn send_message(&self, channel_id: &str, content: &str) -> Result<ChannelMessage> {
        let path = format!("/channels/{}/messages", channel_id);
        let body = serde_json::json!({ "content": content });
        self.request(Method::POST, &path, Some(body)).await
    }
}

#[async_trait::async_trait]
impl GatewaySource for Client {
    async fn gateway_descriptor(&self) -> Result<GatewayDescriptor> {
        Client::gateway_descriptor(self).await
    }
}

#[async_trait::async_trait]
impl TextSender for Client {
    async fn send_text(&self, channel_id: &str, content: &str) -> Result<()> {
        let message = self.send_message(channel_id, content).await?;
        log::debug!("Sent message {} to channel {}", message.id, channel_id);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::Error;

    #[test]
    fn test_token_invalid() {
        let err = Client::new_from_bot_token("bad\ntoken").unwrap_err();
        assert!(matches!(err, Error::TokenInvalid));
    }

    /// Serve one raw http response on a local port, return the base url.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut tcp, _) = listener.accept().await.unwrap();

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = tcp.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            tcp.write_all(response.as_bytes()).await.unwrap();
            tcp.shutdown().await.unwrap();
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_error_body_is_discord_rejected() {
        let base_url = serve_once(
            "401 Unauthorized",
            r#"{"message": "401: Unauthorized", "code": 0}"#,
        )
        .await;
        let client = Client::new_from_bot_token("token")
            .unwrap()
            .with_base_url(base_url);

        let err = client.gateway_descriptor().await.unwrap_err();
        match err {
            Error::DiscordRejected {
                status_code,
                code,
                message,
            } => {
                assert_eq!(status_code, reqwest::StatusCode::UNAUTHORIZED);
                assert_eq!(code, 0);
                assert_eq!(message, "401: Unauthorized");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_not_ok_without_error_body() {
        let base_url = serve_once("502 Bad Gateway", "upstream down").await;
        let client = Client::new_from_bot_token("token")
            .unwrap()
            .with_base_url(base_url);

        let err = client.gateway_descriptor().await.unwrap_err();
        assert!(matches!(
            err,
            Error::HTTPStatusNotOK { status_code, .. } if status_code == reqwest::StatusCode::BAD_GATEWAY
        ));
    }

    #[tokio::test]
    async fn test_gateway_descriptor_success() {
        let base_url = serve_once(
            "200 OK",
            r#"{"url": "wss://gateway.discord.gg", "shards": 1, "session_start_limit": {"total": 1000, "remaining": 999, "reset_after": 14400000, "max_concurrency": 1}}"#,
        )
        .await;
        let client = Client::new_from_bot_token("token")
            .unwrap()
            .with_base_url(base_url);

        let descriptor = client.gateway_descriptor().await.unwrap();
        assert_eq!(descriptor.url, "wss://gateway.discord.gg");
        assert_eq!(descriptor.session_start_limit.remaining, 999);
    }

    #[test]
    fn test_base_url() {
        let client = Client::new_from_bot_token("token")
            .unwrap()
            .with_base_url("http://127.0.0.1:1");
        assert_eq!(client.base_url, "http://127.0.0.1:1");
    }
}
