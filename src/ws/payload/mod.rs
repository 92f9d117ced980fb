//! Discord gateway payload types.

mod stream;
mod types;

pub use stream::{PayloadSink, PayloadStream, PayloadStreamError};
pub use types::{Dispatch, Hello, Resume};

use bytes::Bytes;
use enum_as_inner::EnumAsInner;
use miniz_oxide::inflate::{self, TINFLStatus};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use snafu::prelude::*;

use super::{event::Event, Identify};

/// Gateway opcode, see <https://discord.com/developers/docs/topics/opcodes-and-status-codes#gateway-gateway-opcodes>
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// An event was dispatched, server -> client
    Dispatch,
    /// Keep alive, both direction
    Heartbeat,
    /// Start a new session, client -> server
    Identify,
    /// Update client presence, client -> server
    PresenceUpdate,
    /// Join/leave/move between voice channels, client -> server
    VoiceStateUpdate,
    /// Resume a previous session, client -> server
    Resume,
    /// Client should reconnect and resume, server -> client
    Reconnect,
    /// Request guild members, client -> server
    RequestGuildMembers,
    /// Session has been invalidated, server -> client
    InvalidSession,
    /// Sent immediately after connecting, contains heartbeat interval, server -> client
    Hello,
    /// Heartbeat received, server -> client
    HeartbeatAck,
    /// Request soundboard sounds, client -> server
    RequestSoundboardSounds,
    /// Opcode not in the table above
    Unknown(u64),
}

impl Opcode {
    /// Lookup opcode by its number
    pub fn from_code(code: u64) -> Self {
        match code {
            0 => Self::Dispatch,
            1 => Self::Heartbeat,
            2 => Self::Identify,
            3 => Self::PresenceUpdate,
            4 => Self::VoiceStateUpdate,
            6 => Self::Resume,
            7 => Self::Reconnect,
            8 => Self::RequestGuildMembers,
            9 => Self::InvalidSession,
            10 => Self::Hello,
            11 => Self::HeartbeatAck,
            31 => Self::RequestSoundboardSounds,
            other => Self::Unknown(other),
        }
    }

    /// opcode number
    pub fn code(self) -> u64 {
        match self {
            Self::Dispatch => 0,
            Self::Heartbeat => 1,
            Self::Identify => 2,
            Self::PresenceUpdate => 3,
            Self::VoiceStateUpdate => 4,
            Self::Resume => 6,
            Self::Reconnect => 7,
            Self::RequestGuildMembers => 8,
            Self::InvalidSession => 9,
            Self::Hello => 10,
            Self::HeartbeatAck => 11,
            Self::RequestSoundboardSounds => 31,
            Self::Unknown(code) => code,
        }
    }
}

/// Error when parse frame data as payload
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)), module(error), context(suffix(false)))]
pub enum DecodePayloadError {
    /// Decompress data failed
    #[snafu(display("decompress payload failed: {status:?}"))]
    DecompressFailed {
        /// data for decode
        data: Bytes,
        /// decompress error status code
        status: TINFLStatus,
    },

    /// data is invalid json or not a payload object
    #[snafu(display("parse json failed: {source}"))]
    ParseJSONFailed {
        /// data for decode
        data: Bytes,
        /// source error
        source: serde_json::Error,
    },

    /// dispatch payload has no event name(t) field
    #[snafu(display("dispatch payload (s = {sequence:?}) has no event name"))]
    NoEventName {
        /// sequence number of the payload
        sequence: Option<u64>,
    },

    /// payload data is not valid for its opcode
    #[snafu(display("parse data of {opcode:?} payload failed: {source}"))]
    ParseJSONToTypedPayloadFailed {
        /// payload opcode
        opcode: Opcode,
        /// source error
        source: serde_json::Error,
    },
}

/// Wire form of every payload
#[derive(Debug, Serialize, Deserialize)]
struct RawPayload {
    op: u64,
    #[serde(default)]
    d: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    t: Option<String>,
}

/// Discord gateway payload, tagged by opcode
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Payload {
    /// Dispatch, server -> client
    Dispatch(Dispatch),
    /// Heartbeat with last sequence number, both direction
    Heartbeat(Option<u64>),
    /// Identify, client -> server
    Identify(Box<Identify>),
    /// Presence update, client -> server
    PresenceUpdate(serde_json::Value),
    /// Voice state update, client -> server
    VoiceStateUpdate(serde_json::Value),
    /// Resume, client -> server
    Resume(Resume),
    /// Reconnect, server -> client
    Reconnect,
    /// Request guild members, client -> server
    RequestGuildMembers(serde_json::Value),
    /// Invalid session, true if the session may be resumed, server -> client
    InvalidSession(bool),
    /// Hello, server -> client
    Hello(Hello),
    /// Heartbeat ACK, carries a sequence number when sent by this client
    HeartbeatAck(Option<u64>),
    /// Request soundboard sounds, client -> server
    RequestSoundboardSounds(serde_json::Value),
    /// Payload with an opcode not in [`Opcode`] table, kept as raw json
    Unknown {
        /// opcode number
        op: u64,
        /// payload data
        data: serde_json::Value,
    },
}

impl Payload {
    /// Decode frame data to a payload, `compressed` data is zlib inflated first.
    pub fn decode(mut buff: Bytes, compressed: bool) -> Result<Self, DecodePayloadError> {
        if compressed {
            buff = inflate::decompress_to_vec_zlib(&buff)
                .map_err(|e| DecodePayloadError::DecompressFailed {
                    data: buff.clone(),
                    status: e,
                })?
                .into();
        }

        let raw: RawPayload =
            serde_json::from_slice(&buff).context(error::ParseJSONFailed { data: buff.clone() })?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawPayload) -> Result<Self, DecodePayloadError> {
        let opcode = Opcode::from_code(raw.op);

        let payload = match opcode {
            Opcode::Dispatch => {
                let name = raw
                    .t
                    .with_context(|| error::NoEventName { sequence: raw.s })?;
                // sequence must still be recorded when data does not fit the typed event
                Self::Dispatch(Dispatch {
                    sequence: raw.s,
                    event: Event::from_parts_lossy(name, raw.d),
                })
            }
            // sequence is null before the first dispatch
            Opcode::Heartbeat => Self::Heartbeat(raw.d.as_u64()),
            Opcode::HeartbeatAck => Self::HeartbeatAck(raw.d.as_u64()),
            Opcode::Identify => Self::Identify(Box::new(Self::typed_data(opcode, raw.d)?)),
            Opcode::PresenceUpdate => Self::PresenceUpdate(raw.d),
            Opcode::VoiceStateUpdate => Self::VoiceStateUpdate(raw.d),
            Opcode::Resume => Self::Resume(Self::typed_data(opcode, raw.d)?),
            Opcode::Reconnect => Self::Reconnect,
            Opcode::RequestGuildMembers => Self::RequestGuildMembers(raw.d),
            Opcode::InvalidSession => Self::InvalidSession(raw.d.as_bool().unwrap_or_default()),
            Opcode::Hello => Self::Hello(Self::typed_data(opcode, raw.d)?),
            Opcode::RequestSoundboardSounds => Self::RequestSoundboardSounds(raw.d),
            Opcode::Unknown(op) => {
                log::debug!("Received payload with unknown opcode {}", op);
                Self::Unknown { op, data: raw.d }
            }
        };

        Ok(payload)
    }

    fn typed_data<T: DeserializeOwned>(
        opcode: Opcode,
        data: serde_json::Value,
    ) -> Result<T, DecodePayloadError> {
        serde_json::from_value(data).context(error::ParseJSONToTypedPayloadFailed { opcode })
    }

    /// Encode payload to json text
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let mut s = None;
        let mut t = None;

        let d = match self {
            Self::Dispatch(dispatch) => {
                s = dispatch.sequence;
                t = Some(dispatch.event.name().to_string());
                dispatch.event.data()
            }
            Self::Heartbeat(sequence) | Self::HeartbeatAck(sequence) => {
                serde_json::to_value(sequence)?
            }
            Self::Identify(identify) => serde_json::to_value(identify)?,
            Self::Resume(resume) => serde_json::to_value(resume)?,
            Self::Hello(hello) => serde_json::to_value(hello)?,
            Self::InvalidSession(resumable) => serde_json::Value::Bool(*resumable),
            Self::Reconnect => serde_json::Value::Null,
            Self::PresenceUpdate(d)
            | Self::VoiceStateUpdate(d)
            | Self::RequestGuildMembers(d)
            | Self::RequestSoundboardSounds(d)
            | Self::Unknown { data: d, .. } => d.clone(),
        };

        serde_json::to_string(&RawPayload {
            op: self.opcode().code(),
            d,
            s,
            t,
        })
    }

    /// get opcode
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Dispatch(_) => Opcode::Dispatch,
            Self::Heartbeat(_) => Opcode::Heartbeat,
            Self::Identify(_) => Opcode::Identify,
            Self::PresenceUpdate(_) => Opcode::PresenceUpdate,
            Self::VoiceStateUpdate(_) => Opcode::VoiceStateUpdate,
            Self::Resume(_) => Opcode::Resume,
            Self::Reconnect => Opcode::Reconnect,
            Self::RequestGuildMembers(_) => Opcode::RequestGuildMembers,
            Self::InvalidSession(_) => Opcode::InvalidSession,
            Self::Hello(_) => Opcode::Hello,
            Self::HeartbeatAck(_) => Opcode::HeartbeatAck,
            Self::RequestSoundboardSounds(_) => Opcode::RequestSoundboardSounds,
            Self::Unknown { op, .. } => Opcode::Unknown(*op),
        }
    }

    /// Event name if this is a dispatch payload
    pub fn event_name(&self) -> Option<&str> {
        self.as_dispatch().map(|dispatch| dispatch.event.name())
    }
}
