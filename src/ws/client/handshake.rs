use std::time::Duration;

use futures_util::SinkExt;
use serde::Deserialize;
use snafu::prelude::*;

use super::{Connection, Received, State, Transport};
use crate::ws::{
    event::{Event, Ready, READY},
    payload::{Dispatch, Hello, Payload, PayloadStreamError},
    CloseReason, Identity,
};

/// Error when identify a gateway connection
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(error), context(suffix(false)))]
pub enum IdentifyError {
    /// identify can only be called on a fresh connection
    #[snafu(display("can't identify connection in {state:?} state"))]
    InvalidState {
        /// state when identify is called
        state: State,
    },

    /// underlying payload stream broken
    #[snafu(display("receive payload failed: {source}"))]
    ReceiveFailed {
        /// source error
        source: PayloadStreamError,
    },

    /// send identify payload failed
    #[snafu(display("send identify payload failed: {source}"))]
    SendIdentifyFailed {
        /// source error
        source: PayloadStreamError,
    },

    /// READY event data does not fit the typed form
    #[snafu(display("invalid ready event data {data}: {source}"))]
    InvalidReady {
        /// received event data
        data: serde_json::Value,
        /// source error
        source: serde_json::Error,
    },

    /// gateway rejected the session
    #[snafu(display("session invalidated by gateway (resumable: {resumable})"))]
    InvalidSession {
        /// if the session can be resumed
        resumable: bool,
    },

    /// stream ended before READY
    #[snafu(display("connection closed before ready, close reason: {close:?}"))]
    ConnectionClosed {
        /// close frame sent by gateway, if any
        close: Option<CloseReason>,
    },

    /// closed by a [`CloseHandle`](super::CloseHandle) while handshaking
    #[snafu(display("handshake cancelled by local close"))]
    Cancelled,
}

impl IdentifyError {
    /// close frame sent by gateway during handshake
    pub fn close_reason(&self) -> Option<&CloseReason> {
        match self {
            Self::ConnectionClosed { close } => close.as_ref(),
            _ => None,
        }
    }
}

impl<S: Transport> Connection<S> {
    /// Do the HELLO → IDENTIFY → READY handshake, return the READY event data.
    ///
    /// Heartbeat starts once HELLO is received. There is no retry: on error the
    /// heartbeat is stopped and connection moves to [`State::Failed`].
    pub async fn identify(&mut self, identity: Identity) -> Result<Ready, IdentifyError> {
        ensure!(
            self.state == State::Created,
            error::InvalidState { state: self.state }
        );

        self.state = State::Handshaking;
        self.session.set_open(true);
        log::debug!("Move to handshaking state");

        match self.handshake(identity).await {
            Ok(ready) => {
                self.state = State::Ready;
                log::info!(
                    "Gateway ready, user {} ({:?}), session {:?}",
                    ready.user.id,
                    ready.user.username,
                    ready.session_id
                );
                Ok(ready)
            }
            Err(err) => {
                log::warn!("Handshake failed: {}", err);

                if let Err(err) = self.shutdown().await {
                    log::debug!("Heartbeat stopped with error: {}", err);
                }

                self.state = State::Failed;
                log::debug!("Move to failed state");
                Err(err)
            }
        }
    }

    async fn handshake(&mut self, identity: Identity) -> Result<Ready, IdentifyError> {
        let hello = self.wait_hello().await?;

        log::debug!("Hello message data: {:?}", hello);

        self.start_heartbeat(Duration::from_millis(hello.heartbeat_interval));

        let identify = identity.merge();
        log::debug!(
            "Send identify with intents {:?}, properties {:?}",
            identify.intents,
            identify.properties
        );

        self.sink
            .lock()
            .await
            .send(Payload::Identify(Box::new(identify)))
            .await
            .context(error::SendIdentifyFailed)?;

        self.wait_ready().await
    }

    async fn wait_hello(&mut self) -> Result<Hello, IdentifyError> {
        log::debug!("Waiting hello payload");

        loop {
            match self.next_handshake_payload().await? {
                Payload::Hello(hello) => return Ok(hello),
                other => log::warn!(
                    "Expect hello, ignore received {:?} payload",
                    other.opcode()
                ),
            }
        }
    }

    async fn wait_ready(&mut self) -> Result<Ready, IdentifyError> {
        log::debug!("Waiting ready event");

        loop {
            match self.next_handshake_payload().await? {
                Payload::Dispatch(Dispatch {
                    sequence,
                    event: Event::Ready(ready),
                }) => {
                    if let Some(sequence) = sequence {
                        self.session.update_sequence(sequence);
                    }
                    return Ok(*ready);
                }
                Payload::Dispatch(Dispatch {
                    sequence,
                    event: Event::Unknown { name, data },
                }) if name == READY => {
                    if let Some(sequence) = sequence {
                        self.session.update_sequence(sequence);
                    }
                    return Ready::deserialize(&data).context(error::InvalidReady { data });
                }
                Payload::InvalidSession(resumable) => {
                    return error::InvalidSession { resumable }.fail();
                }
                Payload::Hello(hello) => {
                    log::warn!("Ignore repeated hello {:?}", hello);
                }
                other => log::warn!(
                    "Expect ready, ignore received {:?} payload {:?}",
                    other.opcode(),
                    other.event_name()
                ),
            }
        }
    }

    async fn next_handshake_payload(&mut self) -> Result<Payload, IdentifyError> {
        match self.receive().await {
            Received::Payload(payload) => Ok(payload),
            Received::Failed(source) => Err(IdentifyError::ReceiveFailed { source }),
            Received::Ended => error::ConnectionClosed {
                close: self.stream.close_reason().cloned(),
            }
            .fail(),
            Received::Shutdown => error::Cancelled.fail(),
        }
    }
}
