use std::{pin::Pin, task::Poll};

use bytes::Bytes;
use futures_util::{
    stream::{SplitSink, SplitStream},
    Sink, SinkExt, Stream, StreamExt,
};
use snafu::prelude::*;
use tokio_tungstenite::tungstenite::{
    self as websocket,
    protocol::{frame::coding::CloseCode as WsCloseCode, CloseFrame},
};

use super::{DecodePayloadError, Payload};
use crate::ws::CloseReason;

/// Error when read/write payload stream/sink
#[derive(Debug, Snafu)]
#[snafu(module(error), context(suffix(false)))]
pub enum PayloadStreamError {
    /// underlying websocket stream broken
    #[snafu(display("underlying websocket stream broken: {source}"))]
    Websocket {
        /// source error
        source: websocket::Error,
    },

    /// encode payload to json failed
    #[snafu(display("encode payload failed: {source}"))]
    EncodePayloadFailed {
        /// source error
        source: serde_json::Error,
    },

    /// parse frame data to payload failed
    #[snafu(display("parse frame to payload failed: {source}"))]
    DecodePayloadFailed {
        /// source error
        source: DecodePayloadError,
    },
}

impl PayloadStreamError {
    /// Check if this error will make the stream/sink stop
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Websocket { .. } => true,
            Self::EncodePayloadFailed { .. } | Self::DecodePayloadFailed { .. } => false,
        }
    }

    /// true if the websocket is already closed or closing
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::Websocket {
                source: websocket::Error::ConnectionClosed | websocket::Error::AlreadyClosed
            }
        )
    }
}

/// Read half of gateway connection, yields decoded payloads.
///
/// Text frames are json payloads, binary frames are zlib compressed payloads.
/// The stream ends after a close frame, the close reason is kept in
/// [close_reason](PayloadStream::close_reason).
#[derive(Debug)]
pub struct PayloadStream<S> {
    ws: SplitStream<S>,
    close: Option<CloseReason>,
    ended: bool,
}

impl<S> PayloadStream<S> {
    /// Construct a new stream with underlying websocket read half.
    pub fn new(ws: SplitStream<S>) -> Self {
        Self {
            ws,
            close: None,
            ended: false,
        }
    }

    /// close frame sent by peer, if received
    pub fn close_reason(&self) -> Option<&CloseReason> {
        self.close.as_ref()
    }

    /// true after the peer closed or the underlying stream ended
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl<S> Stream for PayloadStream<S>
where
    S: Stream<Item = Result<websocket::Message, websocket::Error>>,
{
    type Item = Result<Payload, PayloadStreamError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        if self.ended {
            return Poll::Ready(None);
        }

        loop {
            let frame = match futures_util::ready!(self.ws.poll_next_unpin(cx)) {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => return Poll::Ready(Some(Err(e).context(error::Websocket))),
                None => {
                    self.ended = true;
                    return Poll::Ready(None);
                }
            };

            let (buffer, compressed): (Bytes, bool) = match frame {
                websocket::Message::Text(text) => (text.into(), false),
                websocket::Message::Binary(data) => (data.into(), true),
                websocket::Message::Close(frame) => {
                    log::debug!("Received close frame: {:?}", frame);
                    self.close = frame.map(|f| CloseReason {
                        code: f.code.into(),
                        reason: f.reason.into_owned(),
                    });
                    self.ended = true;
                    return Poll::Ready(None);
                }
                // ping/pong is answered by tungstenite
                _ => continue,
            };

            let result = Payload::decode(buffer.clone(), compressed).map_err(|e| {
                log::trace!(
                    "Parse failed payload data: {}",
                    std::str::from_utf8(&buffer).unwrap_or("<not-utf8-binary>")
                );
                PayloadStreamError::DecodePayloadFailed { source: e }
            });

            return Poll::Ready(Some(result));
        }
    }
}

/// Write half of gateway connection, encodes payloads as text frames.
#[derive(Debug)]
pub struct PayloadSink<S> {
    ws: SplitSink<S, websocket::Message>,
}

impl<S> PayloadSink<S>
where
    S: Sink<websocket::Message, Error = websocket::Error>,
{
    /// Construct a new sink with underlying websocket write half.
    pub fn new(ws: SplitSink<S, websocket::Message>) -> Self {
        Self { ws }
    }

    /// Send a close frame with given code
    pub async fn send_close(&mut self, code: u16, reason: &str) -> Result<(), PayloadStreamError> {
        let frame = CloseFrame {
            code: WsCloseCode::from(code),
            reason: reason.to_string().into(),
        };
        self.ws
            .send(websocket::Message::Close(Some(frame)))
            .await
            .context(error::Websocket)
    }
}

impl<S> Sink<Payload> for PayloadSink<S>
where
    S: Sink<websocket::Message, Error = websocket::Error>,
{
    type Error = PayloadStreamError;

    fn poll_ready(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        self.ws
            .poll_ready_unpin(cx)
            .map_err(|e| Self::Error::Websocket { source: e })
    }

    fn start_send(mut self: Pin<&mut Self>, item: Payload) -> Result<(), Self::Error> {
        let text = item.encode().context(error::EncodePayloadFailed)?;
        log::trace!("Send payload: {}", text);
        self.ws
            .start_send_unpin(websocket::Message::Text(text))
            .map_err(|e| Self::Error::Websocket { source: e })
    }

    fn poll_flush(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        self.ws
            .poll_flush_unpin(cx)
            .map_err(|e| Self::Error::Websocket { source: e })
    }

    fn poll_close(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        self.ws
            .poll_close_unpin(cx)
            .map_err(|e| Self::Error::Websocket { source: e })
    }
}
