//! Event names on the wire.

use std::fmt;

/// Protocol event identifiers.
///
/// The envelope's `event` field selects the payload type, the same way an
/// opcode would in a binary protocol. Names are case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// Client asks to be admitted into the room (no payload).
    Join,
    /// Client publishes a chat message.
    SendMessage,
    /// Server delivers a chat message.
    NewMessage,
    /// Server replaces the presence snapshot.
    PresenceUpdate,
    /// Server reports a failure.
    Error,
}

impl EventName {
    /// All known events.
    pub const ALL: [Self; 5] =
        [Self::Join, Self::SendMessage, Self::NewMessage, Self::PresenceUpdate, Self::Error];

    /// Wire name of this event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::SendMessage => "sendMessage",
            Self::NewMessage => "newMessage",
            Self::PresenceUpdate => "presenceUpdate",
            Self::Error => "error",
        }
    }

    /// Parse a wire name. `None` for unknown events.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }

    /// Whether the event travels client to server.
    #[must_use]
    pub const fn is_client_event(self) -> bool {
        matches!(self, Self::Join | Self::SendMessage)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
