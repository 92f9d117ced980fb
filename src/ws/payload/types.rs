use serde::{Deserialize, Serialize};

use crate::ws::event::Event;

/// Dispatch payload data
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// sequence number, used for heartbeat and resume
    pub sequence: Option<u64>,
    /// dispatched event
    pub event: Event,
}

/// Hello payload data
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    /// interval (in milliseconds) the client should heartbeat with
    pub heartbeat_interval: u64,
}

/// Resume payload data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resume {
    /// session token
    pub token: String,
    /// session id from READY event
    pub session_id: String,
    /// last sequence number received
    pub seq: u64,
}
