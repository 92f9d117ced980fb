//! Gateway close codes, see <https://discord.com/developers/docs/topics/opcodes-and-status-codes#gateway-gateway-close-event-codes>

use std::fmt::Display;

/// Symbolic reason of a gateway close code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CloseCode {
    /// 4000, something went wrong, try reconnecting
    UnknownError,
    /// 4001, an invalid opcode or payload for an opcode was sent
    UnknownOpcode,
    /// 4002, an invalid payload was sent
    DecodeError,
    /// 4003, a payload was sent prior to identifying
    NotAuthenticated,
    /// 4004, the token in identify payload was incorrect
    AuthenticationFailed,
    /// 4005, more than one identify payload was sent
    AlreadyAuthenticated,
    /// 4007, the sequence sent when resuming was invalid
    InvalidSequence,
    /// 4008, payloads were sent too quickly
    RateLimited,
    /// 4009, the session timed out
    SessionTimeout,
    /// 4010, an invalid shard was sent when identifying
    InvalidShard,
    /// 4011, the session would have handled too many guilds
    ShardingRequired,
    /// 4012, an invalid gateway version was sent
    InvalidVersion,
    /// 4013, an invalid intent was sent
    InvalidIntent,
    /// 4014, a disallowed (not enabled or not approved) intent was sent
    DisallowedIntent,
}

impl CloseCode {
    /// Lookup a close code, `None` for codes not in the gateway table.
    pub fn from_code(code: u16) -> Option<Self> {
        let c = match code {
            4000 => Self::UnknownError,
            4001 => Self::UnknownOpcode,
            4002 => Self::DecodeError,
            4003 => Self::NotAuthenticated,
            4004 => Self::AuthenticationFailed,
            4005 => Self::AlreadyAuthenticated,
            4007 => Self::InvalidSequence,
            4008 => Self::RateLimited,
            4009 => Self::SessionTimeout,
            4010 => Self::InvalidShard,
            4011 => Self::ShardingRequired,
            4012 => Self::InvalidVersion,
            4013 => Self::InvalidIntent,
            4014 => Self::DisallowedIntent,
            _ => return None,
        };
        Some(c)
    }

    /// numeric close code
    pub fn code(self) -> u16 {
        match self {
            Self::UnknownError => 4000,
            Self::UnknownOpcode => 4001,
            Self::DecodeError => 4002,
            Self::NotAuthenticated => 4003,
            Self::AuthenticationFailed => 4004,
            Self::AlreadyAuthenticated => 4005,
            Self::InvalidSequence => 4007,
            Self::RateLimited => 4008,
            Self::SessionTimeout => 4009,
            Self::InvalidShard => 4010,
            Self::ShardingRequired => 4011,
            Self::InvalidVersion => 4012,
            Self::InvalidIntent => 4013,
            Self::DisallowedIntent => 4014,
        }
    }

    /// symbolic name
    pub fn name(self) -> &'static str {
        match self {
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::UnknownOpcode => "UNKNOWN_OPCODE",
            Self::DecodeError => "DECODE_ERROR",
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::AlreadyAuthenticated => "ALREADY_AUTHENTICATED",
            Self::InvalidSequence => "INVALID_SEQUENCE",
            Self::RateLimited => "RATE_LIMITED",
            Self::SessionTimeout => "SESSION_TIMEOUT",
            Self::InvalidShard => "INVALID_SHARD",
            Self::ShardingRequired => "SHARDING_REQUIRED",
            Self::InvalidVersion => "INVALID_VERSION",
            Self::InvalidIntent => "INVALID_INTENT",
            Self::DisallowedIntent => "DISALLOWED_INTENT",
        }
    }

    /// Whether opening a new connection can help after being closed with this code.
    pub fn is_reconnectable(self) -> bool {
        !matches!(
            self,
            Self::AuthenticationFailed
                | Self::InvalidShard
                | Self::ShardingRequired
                | Self::InvalidVersion
                | Self::InvalidIntent
                | Self::DisallowedIntent
        )
    }
}

impl Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), self.code())
    }
}

/// Close frame received from gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    /// websocket close code
    pub code: u16,
    /// reason text sent by peer, may be empty
    pub reason: String,
}

impl CloseReason {
    /// gateway specific meaning of the code, if any
    pub fn kind(&self) -> Option<CloseCode> {
        CloseCode::from_code(self.code)
    }

    /// Codes outside the gateway table (1000, 1001, ...) are treated as reconnectable.
    pub fn is_reconnectable(&self) -> bool {
        self.kind().map_or(true, CloseCode::is_reconnectable)
    }
}

impl Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{}", kind)?,
            None => write!(f, "{}", self.code)?,
        }
        if !self.reason.is_empty() {
            write!(f, ": {}", self.reason)?;
        }
        Ok(())
    }
}
