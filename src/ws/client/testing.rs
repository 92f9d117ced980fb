//! In memory transport for driving a connection from tests.

use std::{
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    task::Poll,
};

use futures_util::{Sink, Stream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{
    self as websocket,
    protocol::{frame::coding::CloseCode, CloseFrame},
};

use crate::ws::{Opcode, Payload};

type Frame = Result<websocket::Message, websocket::Error>;

/// Client side of the in memory transport
#[derive(Debug)]
pub(crate) struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Frame>,
    outgoing: mpsc::UnboundedSender<websocket::Message>,
    stalled: Arc<AtomicBool>,
}

/// Server side of the in memory transport
#[derive(Debug)]
pub(crate) struct MockServer {
    tx: Option<mpsc::UnboundedSender<Frame>>,
    rx: mpsc::UnboundedReceiver<websocket::Message>,
    stalled: Arc<AtomicBool>,
}

pub(crate) fn pair() -> (MockTransport, MockServer) {
    let (server_tx, incoming) = mpsc::unbounded_channel();
    let (outgoing, server_rx) = mpsc::unbounded_channel();
    let stalled = Arc::new(AtomicBool::new(false));

    (
        MockTransport {
            incoming,
            outgoing,
            stalled: stalled.clone(),
        },
        MockServer {
            tx: Some(server_tx),
            rx: server_rx,
            stalled,
        },
    )
}

impl MockServer {
    pub fn send(&self, payload: Payload) {
        self.send_frame(websocket::Message::Text(payload.encode().unwrap()));
    }

    pub fn send_json(&self, value: serde_json::Value) {
        self.send_frame(websocket::Message::Text(value.to_string()));
    }

    pub fn send_close(&self, code: u16, reason: &str) {
        self.send_frame(websocket::Message::Close(Some(CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        })));
    }

    pub fn send_frame(&self, frame: websocket::Message) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Ok(frame));
        }
    }

    /// Client writes never complete from now on, like a full send buffer
    pub fn stall(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    /// End the client read stream without a close frame
    pub fn hang_up(&mut self) {
        self.tx.take();
    }

    /// Next payload sent by client, non-text frames are skipped
    pub async fn recv(&mut self) -> Option<Payload> {
        loop {
            let frame = self.rx.recv().await?;
            if let Some(payload) = Self::decode(frame) {
                return Some(payload);
            }
        }
    }

    /// Next payload sent by client which is not a heartbeat
    pub async fn recv_skip_heartbeat(&mut self) -> Option<Payload> {
        loop {
            let payload = self.recv().await?;
            if payload.opcode() != Opcode::Heartbeat {
                return Some(payload);
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<websocket::Message> {
        self.rx.try_recv().ok()
    }

    /// All frames sent by client until now
    pub fn drain(&mut self) -> Vec<websocket::Message> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// All payloads sent by client until now, heartbeats excluded
    pub fn drain_skip_heartbeat(&mut self) -> Vec<Payload> {
        self.drain()
            .into_iter()
            .filter_map(Self::decode)
            .filter(|payload| payload.opcode() != Opcode::Heartbeat)
            .collect()
    }

    fn decode(frame: websocket::Message) -> Option<Payload> {
        match frame {
            websocket::Message::Text(text) => Some(Payload::decode(text.into(), false).unwrap()),
            _ => None,
        }
    }
}

impl Stream for MockTransport {
    type Item = Frame;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.incoming.poll_recv(cx)
    }
}

impl MockTransport {
    fn write_poll(&self) -> Poll<Result<(), websocket::Error>> {
        if self.stalled.load(Ordering::SeqCst) {
            Poll::Pending
        } else {
            Poll::Ready(Ok(()))
        }
    }
}

impl Sink<websocket::Message> for MockTransport {
    type Error = websocket::Error;

    fn poll_ready(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        self.write_poll()
    }

    fn start_send(self: Pin<&mut Self>, item: websocket::Message) -> Result<(), Self::Error> {
        self.outgoing.send(item).map_err(|_| {
            websocket::Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock server gone",
            ))
        })
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        self.write_poll()
    }

    fn poll_close(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        self.write_poll()
    }
}
