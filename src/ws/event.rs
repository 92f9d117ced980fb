//! Discord gateway events in [Dispatch](super::Payload::Dispatch) payload.

use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// Event name of the session ready signal
pub const READY: &str = "READY";
/// Event name of a new message
pub const MESSAGE_CREATE: &str = "MESSAGE_CREATE";

/// Dispatch event, keyed by event name
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Event {
    /// READY, end of a successful identify
    Ready(Box<Ready>),
    /// MESSAGE_CREATE
    MessageCreate(Box<Message>),
    /// Any other event, kept as raw json
    Unknown {
        /// event name
        name: String,
        /// event data
        data: serde_json::Value,
    },
}

/// Error when parse event data into its typed form
#[derive(Debug, Snafu)]
#[snafu(display("parse {name} event data failed: {source}"))]
pub struct ParseEventError {
    /// event name
    pub name: String,
    /// event data
    pub data: serde_json::Value,
    /// source error
    pub source: serde_json::Error,
}

impl ParseEventError {
    /// Keep the event as [`Event::Unknown`] with its raw data.
    pub fn into_unknown(self) -> Event {
        Event::Unknown {
            name: self.name,
            data: self.data,
        }
    }
}

impl Event {
    /// Build typed event from event name and data.
    pub fn from_parts(name: String, data: serde_json::Value) -> Result<Self, ParseEventError> {
        let parsed = match name.as_str() {
            READY => Ready::deserialize(&data).map(|ready| Self::Ready(Box::new(ready))),
            MESSAGE_CREATE => {
                Message::deserialize(&data).map(|message| Self::MessageCreate(Box::new(message)))
            }
            _ => return Ok(Self::Unknown { name, data }),
        };

        parsed.context(ParseEventSnafu { name, data })
    }

    /// Like [`from_parts`](Self::from_parts), but data which does not fit the
    /// typed form is kept as [`Event::Unknown`].
    pub fn from_parts_lossy(name: String, data: serde_json::Value) -> Self {
        Self::from_parts(name, data).unwrap_or_else(|err| {
            log::warn!("{}, keep it as raw event", err);
            err.into_unknown()
        })
    }

    /// event name
    pub fn name(&self) -> &str {
        match self {
            Self::Ready(_) => READY,
            Self::MessageCreate(_) => MESSAGE_CREATE,
            Self::Unknown { name, .. } => name,
        }
    }

    /// event data as json
    pub fn data(&self) -> serde_json::Value {
        // typed events are built from json, convert back can not fail
        let value = match self {
            Self::Ready(ready) => serde_json::to_value(ready),
            Self::MessageCreate(message) => serde_json::to_value(message),
            Self::Unknown { data, .. } => return data.clone(),
        };
        value.unwrap_or_default()
    }
}

/// READY event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ready {
    /// gateway version
    #[serde(default, rename = "v", skip_serializing_if = "Option::is_none")]
    pub version: Option<u8>,
    /// the bot user
    pub user: User,
    /// session id, needed for resume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// gateway url for resuming connections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_gateway_url: Option<String>,
    /// unavailable guilds the user is in
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guilds: Vec<serde_json::Value>,
}

/// User object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// snowflake id
    pub id: String,
    /// user name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// whether the user is a bot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<bool>,
}

/// Message object in MESSAGE_CREATE event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// message id
    pub id: String,
    /// channel the message was sent in
    pub channel_id: String,
    /// guild the message was sent in, none for direct messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    /// author of this message
    pub author: User,
    /// message text, empty without MESSAGE_CONTENT intent
    #[serde(default)]
    pub content: String,
    /// users specifically mentioned in the message
    #[serde(default)]
    pub mentions: Vec<User>,
}

impl Message {
    /// true if user with `id` is mentioned in this message
    pub fn mentions_user(&self, id: &str) -> bool {
        self.mentions.iter().any(|user| user.id == id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ready_minimal() {
        let event = Event::from_parts(READY.to_string(), json!({"user": {"id": "42"}})).unwrap();

        let ready = event.into_ready().unwrap();
        assert_eq!(ready.user.id, "42");
        assert_eq!(ready.session_id, None);
    }

    #[test]
    fn test_message_create() {
        let event = Event::from_parts(
            MESSAGE_CREATE.to_string(),
            json!({
                "id": "1",
                "channel_id": "2",
                "author": {"id": "3", "username": "someone"},
                "content": "hi <@42>",
                "mentions": [{"id": "42"}],
                "tts": false,
            }),
        )
        .unwrap();

        assert_eq!(event.name(), MESSAGE_CREATE);
        let message = event.into_message_create().unwrap();
        assert_eq!(message.channel_id, "2");
        assert!(message.mentions_user("42"));
        assert!(!message.mentions_user("3"));
    }

    #[test]
    fn test_unknown_event_kept_raw() {
        let data = json!({"guild_id": "1"});
        let event = Event::from_parts("GUILD_CREATE".to_string(), data.clone()).unwrap();

        assert_eq!(event.name(), "GUILD_CREATE");
        assert_eq!(event.data(), data);
    }

    #[test]
    fn test_bad_ready_data() {
        let err = Event::from_parts(READY.to_string(), json!({"user": 1})).unwrap_err();
        assert_eq!(err.name, READY);
        assert_eq!(err.data, json!({"user": 1}));
    }

    #[test]
    fn test_lossy_keeps_bad_message_as_raw() {
        // author is missing
        let data = json!({"id": "1", "channel_id": "c", "content": "x"});
        let event = Event::from_parts_lossy(MESSAGE_CREATE.to_string(), data.clone());

        assert_eq!(event.name(), MESSAGE_CREATE);
        assert!(event.as_message_create().is_none());
        assert_eq!(event.data(), data);
    }
}
