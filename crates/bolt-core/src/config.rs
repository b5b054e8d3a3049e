//! Session configuration.

use std::time::Duration;

use bolt_proto::{Payload, SendMessage};

use crate::presence::ROOM_CAPACITY;

/// Default delay before the first reconnect attempt.
pub const DEFAULT_RECONNECT_BASE: Duration = Duration::from_millis(500);

/// Upper bound on a single reconnect delay.
pub const DEFAULT_RECONNECT_CAP: Duration = Duration::from_secs(30);

/// Reconnect attempts before giving up.
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;

/// Outbound encoding of chat messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WireFormat {
    /// Typed object with kind, image reference and correlation id.
    #[default]
    Typed,
    /// Bare string with code fenced and images as name markers. Loses the
    /// correlation id, so echoes are never reconciled.
    Legacy,
}

impl WireFormat {
    /// Encode an outbound message in this format.
    pub fn encode(self, message: SendMessage) -> Payload {
        match self {
            Self::Typed => Payload::SendMessage(message),
            Self::Legacy => Payload::LegacySendMessage(message.to_legacy()),
        }
    }
}

/// Reconnect policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Whether dropped connections are retried at all
    pub enabled: bool,
    /// Delay before the first attempt; doubled after each failure
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Attempts before giving up
    pub max_attempts: u32,
}

impl ReconnectConfig {
    /// Policy that never reconnects.
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_delay: DEFAULT_RECONNECT_BASE,
            max_delay: DEFAULT_RECONNECT_CAP,
            max_attempts: DEFAULT_RECONNECT_ATTEMPTS,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum participants per room, used to clamp presence counts
    pub room_capacity: u32,
    /// Outbound message encoding
    pub wire_format: WireFormat,
    /// Reconnect policy
    pub reconnect: ReconnectConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            room_capacity: ROOM_CAPACITY,
            wire_format: WireFormat::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}
