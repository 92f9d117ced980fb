//! Gateway connection and its lifecycle.
//!
//! A [`Connection`] goes through `Created → Handshaking → Ready → Closed`,
//! a failed handshake ends in `Failed`:
//!
//! - [`Connection::identify`] waits HELLO, starts heartbeat, sends IDENTIFY and waits READY
//! - [`Connection::listen`] dispatches received payloads until the stream ends
//! - [`Connection::close`] stops everything, can be called at any time

mod dispatch;
mod gateway;
mod handshake;
mod heartbeat;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatch::ListenError;
pub use gateway::{BootstrapError, ConnectGatewayError, Gateway};
pub use handshake::IdentifyError;
pub use heartbeat::HeartbeatError;

use std::{fmt, sync::Arc, time::Duration};

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{watch, Mutex};
use tokio_tungstenite::{self as websocket, tungstenite};

use super::payload::{Payload, PayloadSink, PayloadStream, PayloadStreamError};
use heartbeat::HeartbeatHandle;
use session::SessionState;

/// Websocket stream created by [`Gateway::connect`]
pub type WebsocketClient =
    websocket::WebSocketStream<websocket::MaybeTlsStream<tokio::net::TcpStream>>;

pub(crate) type SharedSink<S> = Arc<Mutex<PayloadSink<S>>>;

/// How long closing waits the close frame to be sent
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Underlying frame transport of a connection.
pub trait Transport:
    Stream<Item = Result<tungstenite::Message, tungstenite::Error>>
    + Sink<tungstenite::Message, Error = tungstenite::Error>
    + Send
    + Unpin
    + 'static
{
}

impl<T> Transport for T where
    T: Stream<Item = Result<tungstenite::Message, tungstenite::Error>>
        + Sink<tungstenite::Message, Error = tungstenite::Error>
        + Send
        + Unpin
        + 'static
{
}

/// Connection lifecycle state
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum State {
    /// transport is open, nothing sent yet
    Created,
    /// waiting HELLO or READY
    Handshaking,
    /// READY received, payloads can be listened
    Ready,
    /// closed by peer or locally
    Closed,
    /// handshake failed
    Failed,
}

/// A gateway connection over transport `S`.
pub struct Connection<S = WebsocketClient> {
    state: State,
    stream: PayloadStream<S>,
    sink: SharedSink<S>,
    session: Arc<SessionState>,
    heartbeat: Option<HeartbeatHandle>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("session", &self.session)
            .field("heartbeat", &self.heartbeat)
            .field("close", &self.stream.close_reason())
            .finish_non_exhaustive()
    }
}

enum Received {
    Payload(Payload),
    Failed(PayloadStreamError),
    Ended,
    Shutdown,
}

impl<S: Transport> Connection<S> {
    /// Wrap an opened transport, nothing is sent until [`identify`](Self::identify).
    pub fn new(ws: S) -> Self {
        let (sink, stream) = ws.split();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            state: State::Created,
            stream: PayloadStream::new(stream),
            sink: Arc::new(Mutex::new(PayloadSink::new(sink))),
            session: Arc::new(SessionState::new()),
            heartbeat: None,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// current lifecycle state
    pub fn state(&self) -> State {
        self.state
    }

    /// last sequence number received, kept after close
    pub fn sequence(&self) -> Option<u64> {
        self.session.sequence()
    }

    /// heartbeat interval told by HELLO, while the heartbeat is running
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat.as_ref().map(HeartbeatHandle::interval)
    }

    /// true if heartbeat task is started and not finished yet
    pub fn is_heartbeat_running(&self) -> bool {
        self.heartbeat
            .as_ref()
            .map(HeartbeatHandle::is_running)
            .unwrap_or(false)
    }

    /// A handle which can stop this connection from other tasks.
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            shutdown: self.shutdown_tx.clone(),
            session: self.session.clone(),
        }
    }

    /// A handle which can send payloads from other tasks.
    pub fn sender(&self) -> GatewaySender<S> {
        GatewaySender {
            sink: self.sink.clone(),
            session: self.session.clone(),
        }
    }

    /// Send a caller-driven payload, like presence update or resume.
    pub async fn send(&self, payload: Payload) -> Result<(), PayloadStreamError> {
        self.sender().send(payload).await
    }

    /// Stop heartbeat, send close frame and move to closed state.
    ///
    /// Calling it more than once, or after the connection ended, does nothing.
    pub async fn close(&mut self) {
        if matches!(self.state, State::Closed | State::Failed) {
            log::trace!("Connection already {:?}, skip close", self.state);
            return;
        }

        log::debug!("Closing connection in {:?} state", self.state);

        if let Err(err) = self.shutdown().await {
            log::warn!("Heartbeat stopped with error: {}", err);
        }

        self.state = State::Closed;
        log::debug!("Move to closed state");
    }

    fn start_heartbeat(&mut self, interval: Duration) {
        if let Some(ref heartbeat) = self.heartbeat {
            log::warn!(
                "Heartbeat already running with interval {:?}, ignore new interval {:?}",
                heartbeat.interval(),
                interval
            );
            return;
        }

        self.heartbeat.replace(HeartbeatHandle::start(
            interval,
            self.session.clone(),
            self.sink.clone(),
        ));
    }

    async fn receive(&mut self) -> Received {
        loop {
            if *self.shutdown_rx.borrow() {
                return Received::Shutdown;
            }

            let item = tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    log::debug!("Received close signal");
                    return Received::Shutdown;
                }

                item = self.stream.next() => item,
            };

            match item {
                Some(Ok(payload)) => {
                    log::trace!("Received {:?} payload", payload.opcode());
                    return Received::Payload(payload);
                }
                Some(Err(err)) if !err.is_fatal() => {
                    log::warn!("Payload stream error happened but ignored: {}", err);
                }
                Some(Err(err)) => return Received::Failed(err),
                None => return Received::Ended,
            }
        }
    }

    async fn shutdown(&mut self) -> Result<(), HeartbeatError> {
        self.session.set_open(false);

        let result = match self.heartbeat.take() {
            Some(heartbeat) => heartbeat.stop().await,
            None => Ok(()),
        };

        let ended = self.stream.is_ended();
        let sink = &self.sink;
        let closing = async {
            let mut sink = sink.lock().await;
            if ended {
                // only flush the close reply queued by websocket
                sink.close().await
            } else {
                log::trace!("Send close frame");
                sink.send_close(1000, "").await
            }
        };

        match tokio::time::timeout(CLOSE_TIMEOUT, closing).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::debug!("Close websocket failed: {}", err),
            Err(_) => log::warn!("Close websocket not done in {:?}, give up", CLOSE_TIMEOUT),
        }

        result
    }
}

/// Cloneable handle to close a connection from another task.
///
/// A running [`Connection::listen`] returns soon after [`close`](Self::close),
/// a running [`Connection::identify`] fails with [`IdentifyError::Cancelled`].
#[derive(Debug, Clone)]
pub struct CloseHandle {
    shutdown: Arc<watch::Sender<bool>>,
    session: Arc<SessionState>,
}

impl CloseHandle {
    /// Signal the connection to close
    pub fn close(&self) {
        self.session.set_open(false);
        let _ = self.shutdown.send(true);
    }
}

/// Cloneable handle to send payloads over a connection.
pub struct GatewaySender<S> {
    sink: SharedSink<S>,
    session: Arc<SessionState>,
}

impl<S> Clone for GatewaySender<S> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
            session: self.session.clone(),
        }
    }
}

impl<S> fmt::Debug for GatewaySender<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewaySender")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<S: Transport> GatewaySender<S> {
    /// Send a payload, fails once the connection is closed.
    pub async fn send(&self, payload: Payload) -> Result<(), PayloadStreamError> {
        if !self.session.is_open() {
            return Err(PayloadStreamError::Websocket {
                source: tungstenite::Error::AlreadyClosed,
            });
        }

        self.sink.lock().await.send(payload).await
    }
}
