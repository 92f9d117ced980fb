//! # Cordial
//!
//! A Discord gateway bot framework.
//!
//! [`ws::Connection`] is the gateway protocol client: HELLO → IDENTIFY →
//! READY handshake, a heartbeat task, and a dispatch loop. [`Bot`] drives
//! connections in a reconnect loop and fans payloads out to [`subscriber`]s.

#![deny(clippy::all)]
#![warn(missing_debug_implementations, missing_docs)]
#![forbid(unsafe_code)]

pub mod api;
pub mod filter;
pub mod subscriber;
pub mod ws;

mod bot;
mod error;

pub use bot::Bot;
pub use error::{Error, Result};
