//! Gateway intents, see <https://discord.com/developers/docs/topics/gateway#gateway-intents>

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Bit set of event categories the client wants to receive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Intents(u64);

impl Intents {
    /// guild create/update/delete, roles, channels, threads
    pub const GUILDS: Self = Self(1 << 0);
    /// member add/update/remove (privileged)
    pub const GUILD_MEMBERS: Self = Self(1 << 1);
    /// audit log, bans
    pub const GUILD_MODERATION: Self = Self(1 << 2);
    /// emojis, stickers, soundboard sounds
    pub const GUILD_EXPRESSIONS: Self = Self(1 << 3);
    /// integrations
    pub const GUILD_INTEGRATIONS: Self = Self(1 << 4);
    /// webhooks
    pub const GUILD_WEBHOOKS: Self = Self(1 << 5);
    /// invites
    pub const GUILD_INVITES: Self = Self(1 << 6);
    /// voice states
    pub const GUILD_VOICE_STATES: Self = Self(1 << 7);
    /// presences (privileged)
    pub const GUILD_PRESENCES: Self = Self(1 << 8);
    /// guild messages
    pub const GUILD_MESSAGES: Self = Self(1 << 9);
    /// guild message reactions
    pub const GUILD_MESSAGE_REACTIONS: Self = Self(1 << 10);
    /// guild typing start
    pub const GUILD_MESSAGE_TYPING: Self = Self(1 << 11);
    /// direct messages
    pub const DIRECT_MESSAGES: Self = Self(1 << 12);
    /// direct message reactions
    pub const DIRECT_MESSAGE_REACTIONS: Self = Self(1 << 13);
    /// direct message typing start
    pub const DIRECT_MESSAGE_TYPING: Self = Self(1 << 14);
    /// message content (privileged)
    pub const MESSAGE_CONTENT: Self = Self(1 << 15);
    /// scheduled events
    pub const GUILD_SCHEDULED_EVENTS: Self = Self(1 << 16);
    /// auto moderation rule changes
    pub const AUTO_MODERATION_CONFIGURATION: Self = Self(1 << 20);
    /// auto moderation actions
    pub const AUTO_MODERATION_EXECUTION: Self = Self(1 << 21);
    /// guild poll votes
    pub const GUILD_MESSAGE_POLLS: Self = Self(1 << 24);
    /// direct message poll votes
    pub const DIRECT_MESSAGE_POLLS: Self = Self(1 << 25);

    /// Intents used when the caller does not choose any.
    pub const DEFAULT: Self =
        Self(Self::GUILDS.0 | Self::GUILD_MESSAGES.0 | Self::DIRECT_MESSAGES.0);

    /// No intent at all
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build from raw bits, unknown bits are kept as is.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw bits sent in identify payload
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// true if all bits of `other` are set in self
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for Intents {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl BitOr for Intents {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Intents {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
