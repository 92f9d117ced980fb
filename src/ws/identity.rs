//! Identity sent in [Identify](super::Payload::Identify) payload.

use serde::{Deserialize, Serialize};

use super::Intents;

/// Caller supplied identity, missing fields are filled with defaults when identifying.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity {
    /// bot token, without the `Bot ` prefix
    pub token: String,
    /// wanted intents, [Intents::DEFAULT] if unset
    pub intents: Option<Intents>,
    /// connection properties, [ConnectionProperties::default] if unset
    pub properties: Option<ConnectionProperties>,
    /// initial presence, [Presence::default] if unset
    pub presence: Option<Presence>,
}

impl Identity {
    /// Create identity with only a token
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    /// Set intents
    pub fn intents(mut self, intents: Intents) -> Self {
        self.intents = Some(intents);
        self
    }

    /// Set connection properties
    pub fn properties(mut self, properties: ConnectionProperties) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Set initial presence
    pub fn presence(mut self, presence: Presence) -> Self {
        self.presence = Some(presence);
        self
    }

    /// Merge with defaults, fields set by caller take precedence.
    pub fn merge(self) -> Identify {
        Identify {
            token: self.token,
            intents: self.intents.unwrap_or_default(),
            properties: self.properties.unwrap_or_default(),
            presence: self.presence.unwrap_or_default(),
        }
    }
}

/// Data of identify payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identify {
    /// authentication token
    pub token: String,
    /// OR of wanted intents
    pub intents: Intents,
    /// connection properties
    pub properties: ConnectionProperties,
    /// initial presence
    pub presence: Presence,
}

/// Connection properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProperties {
    /// operating system
    pub os: String,
    /// library name
    pub browser: String,
    /// library name
    pub device: String,
}

impl Default for ConnectionProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: env!("CARGO_PKG_NAME").to_string(),
            device: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

/// Presence of the bot user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    /// unix time (ms) of when the client went idle, none if not idle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<u64>,
    /// online, dnd, idle, invisible or offline
    pub status: String,
    /// whether or not the client is afk
    pub afk: bool,
    /// user activities
    pub activities: Vec<Activity>,
}

impl Default for Presence {
    fn default() -> Self {
        Self {
            since: None,
            status: "online".to_string(),
            afk: false,
            activities: Vec::new(),
        }
    }
}

/// Activity shown in presence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// activity name
    pub name: String,
    /// 0 playing, 1 streaming, 2 listening, 3 watching, 4 custom, 5 competing
    #[serde(rename = "type")]
    pub kind: u8,
    /// stream url, only for streaming
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
