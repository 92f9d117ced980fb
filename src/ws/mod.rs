//! Discord gateway protocol client implement

pub mod client;
mod close;
pub mod event;
mod identity;
mod intents;
pub mod payload;

pub use client::{
    BootstrapError, CloseHandle, ConnectGatewayError, Connection, Gateway, GatewaySender,
    HeartbeatError, IdentifyError, ListenError, State, Transport, WebsocketClient,
};
pub use close::{CloseCode, CloseReason};
pub use event::{Event, Message, Ready, User};
pub use identity::{Activity, ConnectionProperties, Identify, Identity, Presence};
pub use intents::Intents;
pub use payload::{Opcode, Payload};
