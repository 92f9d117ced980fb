//! framework error types

use snafu::prelude::*;

use super::api::Error as APIError;
use super::ws::{BootstrapError, CloseReason, ConnectGatewayError, IdentifyError, ListenError};

/// framework result type
pub type Result<T> = std::result::Result<T, Error>;

/// framework error type
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), context(suffix(false)))]
pub enum Error {
    /// Call discord api failed
    #[snafu(display("call discord api failed: {source}"))]
    CallAPIFailed {
        /// source error
        source: APIError,
    },

    /// Get a usable gateway failed
    #[snafu(display("bootstrap gateway failed: {source}"))]
    BootstrapFailed {
        /// source error
        source: BootstrapError,
    },

    /// Open websocket connection failed
    #[snafu(display("connect gateway failed: {source}"))]
    ConnectFailed {
        /// source error
        source: ConnectGatewayError,
    },

    /// Gateway handshake failed
    #[snafu(display("identify failed: {source}"))]
    IdentifyFailed {
        /// source error
        source: IdentifyError,
    },

    /// Dispatch loop stopped with error
    #[snafu(display("listen gateway failed: {source}"))]
    ListenFailed {
        /// source error
        source: ListenError,
    },

    /// Gateway closed connection with a reason that reconnect can't fix
    #[snafu(display("gateway closed connection and should not reconnect: {reason}"))]
    GatewayRejected {
        /// close frame sent by gateway
        reason: CloseReason,
    },
}

impl Error {
    /// close reason sent by gateway, if this error carries one
    pub fn close_reason(&self) -> Option<&CloseReason> {
        match self {
            Self::IdentifyFailed { source } => source.close_reason(),
            Self::GatewayRejected { reason } => Some(reason),
            _ => None,
        }
    }
}
