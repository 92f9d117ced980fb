use futures_util::SinkExt;
use snafu::prelude::*;

use super::{Connection, HeartbeatError, Received, State, Transport};
use crate::ws::{
    payload::{Opcode, Payload, PayloadStreamError},
    CloseReason,
};

/// Error when listen on a ready connection
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(error), context(suffix(false)))]
pub enum ListenError {
    /// listen can only be called after a successful identify
    #[snafu(display("can't listen connection in {state:?} state"))]
    NotReady {
        /// state when listen is called
        state: State,
    },

    /// underlying payload stream broken
    #[snafu(display("receive payload failed: {source}"))]
    ReceiveFailed {
        /// source error
        source: PayloadStreamError,
    },

    /// reply heartbeat request failed
    #[snafu(display("send heartbeat ack failed: {source}"))]
    SendHeartbeatAckFailed {
        /// source error
        source: PayloadStreamError,
    },

    /// heartbeat task ended with error
    #[snafu(display("heartbeat failed: {source}"))]
    HeartbeatFailed {
        /// source error
        source: HeartbeatError,
    },
}

impl<S: Transport> Connection<S> {
    /// Receive payloads in arrival order and give them to `on_event`.
    ///
    /// Heartbeat requests are answered here and are not given to `on_event`,
    /// neither are heartbeat ACKs.
    ///
    /// Returns when gateway closes the connection (with its close reason, if
    /// any), or when closed by a [`CloseHandle`](super::CloseHandle). The
    /// connection is [`State::Closed`] after this returns.
    pub async fn listen<F>(&mut self, mut on_event: F) -> Result<Option<CloseReason>, ListenError>
    where
        F: FnMut(Payload),
    {
        ensure!(
            self.state == State::Ready,
            error::NotReady { state: self.state }
        );

        log::debug!("Start listening, sequence {:?}", self.sequence());

        let result = self.dispatch_loop(&mut on_event).await;
        let heartbeat = self.shutdown().await;

        self.state = State::Closed;
        log::debug!("Move to closed state");

        match (result, heartbeat) {
            (Ok(close), Ok(())) => Ok(close),
            (Ok(_), Err(err)) => Err(err).context(error::HeartbeatFailed),
            (Err(err), heartbeat) => {
                if let Err(heartbeat_err) = heartbeat {
                    log::debug!("Heartbeat also stopped with error: {}", heartbeat_err);
                }
                Err(err)
            }
        }
    }

    async fn dispatch_loop<F>(&mut self, on_event: &mut F) -> Result<Option<CloseReason>, ListenError>
    where
        F: FnMut(Payload),
    {
        loop {
            let payload = match self.receive().await {
                Received::Payload(payload) => payload,
                Received::Failed(source) => return Err(ListenError::ReceiveFailed { source }),
                Received::Ended => {
                    let close = self.stream.close_reason().cloned();
                    match close {
                        Some(ref reason) => log::info!("Gateway closed connection: {}", reason),
                        None => log::info!("Gateway stream ended without close frame"),
                    }
                    return Ok(close);
                }
                Received::Shutdown => {
                    log::debug!("Stop listening by close signal");
                    return Ok(None);
                }
            };

            match payload.opcode() {
                Opcode::Heartbeat => {
                    let sequence = self.session.sequence();
                    log::trace!("Gateway requests heartbeat, ack with sequence {:?}", sequence);

                    self.sink
                        .lock()
                        .await
                        .send(Payload::HeartbeatAck(sequence))
                        .await
                        .context(error::SendHeartbeatAckFailed)?;
                }
                Opcode::HeartbeatAck => {
                    log::debug!("Heartbeat acknowledged");
                }
                _ => {
                    if let Some(sequence) = payload.as_dispatch().and_then(|d| d.sequence) {
                        self.session.update_sequence(sequence);
                    }
                    log::trace!("Dispatch {:?} payload", payload.event_name());
                    on_event(payload);
                }
            }
        }
    }
}
