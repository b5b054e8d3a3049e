//! Typed protocol payloads.
//!
//! The envelope's event name selects the payload type. Outbound encoding is
//! strict; inbound decoding of server events is lenient so that a single odd
//! field never costs the session.
//!
//! # Invariants
//!
//! Each payload variant maps to exactly one [`EventName`] (enforced by match
//! exhaustiveness). Both send variants map to `sendMessage`.

pub mod chat;
pub mod error;
pub mod presence;

use serde_json::Value;

use crate::{
    EventName, Frame,
    errors::{ProtocolError, Result},
};

/// All payloads of the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Admission request, sent once per opened connection.
    Join,
    /// Canonical typed chat message.
    SendMessage(chat::SendMessage),
    /// Degraded bare-string chat message.
    LegacySendMessage(String),
    /// Chat message delivered by the gateway.
    NewMessage(chat::InboundMessage),
    /// Presence snapshot.
    PresenceUpdate(presence::PresenceUpdate),
    /// Gateway error.
    Error(error::ErrorPayload),
}

impl Payload {
    /// Event corresponding to this payload.
    #[must_use]
    pub const fn event(&self) -> EventName {
        match self {
            Self::Join => EventName::Join,
            Self::SendMessage(_) | Self::LegacySendMessage(_) => EventName::SendMessage,
            Self::NewMessage(_) => EventName::NewMessage,
            Self::PresenceUpdate(_) => EventName::PresenceUpdate,
            Self::Error(_) => EventName::Error,
        }
    }

    /// Convert into a transport frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Encode` if serialization fails
    pub fn into_frame(self) -> Result<Frame> {
        let event = self.event();
        let data = match self {
            Self::Join => None,
            Self::SendMessage(inner) => Some(to_value(&inner)?),
            Self::LegacySendMessage(text) => Some(Value::String(text)),
            Self::NewMessage(inner) => Some(to_value(&inner)?),
            Self::PresenceUpdate(inner) => Some(to_value(&inner)?),
            Self::Error(inner) => Some(to_value(&inner)?),
        };
        Ok(Frame::new(event, data))
    }

    /// Parse a transport frame.
    ///
    /// Server events (`newMessage`, `presenceUpdate`, `error`) are decoded
    /// leniently. `sendMessage` is decoded strictly since only gateways and
    /// test doubles read it.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownEvent` for unrecognized event names
    /// - `ProtocolError::MissingPayload` if a payload-carrying event has none
    /// - `ProtocolError::InvalidPayload` if a `sendMessage` payload is neither
    ///   a string nor a valid typed object
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let event =
            frame.event_name().ok_or_else(|| ProtocolError::UnknownEvent(frame.event.clone()))?;

        match event {
            EventName::Join => Ok(Self::Join),
            EventName::SendMessage => match require(event, frame.data.as_ref())? {
                Value::String(text) => Ok(Self::LegacySendMessage(text.clone())),
                value @ Value::Object(_) => serde_json::from_value(value.clone())
                    .map(Self::SendMessage)
                    .map_err(|e| invalid(event, e.to_string())),
                other => Err(invalid(event, format!("unexpected JSON value {other}"))),
            },
            EventName::NewMessage => {
                let data = require(event, frame.data.as_ref())?;
                Ok(Self::NewMessage(chat::InboundMessage::from_value(data)))
            },
            EventName::PresenceUpdate => {
                let data = require(event, frame.data.as_ref())?;
                Ok(Self::PresenceUpdate(presence::PresenceUpdate::from_value(data)))
            },
            EventName::Error => {
                let data = frame.data.as_ref().unwrap_or(&Value::Null);
                Ok(Self::Error(error::ErrorPayload::from_value(data)))
            },
        }
    }
}

fn to_value<T: serde::Serialize>(inner: &T) -> Result<Value> {
    serde_json::to_value(inner).map_err(|e| ProtocolError::Encode(e.to_string()))
}

fn require(event: EventName, data: Option<&Value>) -> Result<&Value> {
    data.ok_or(ProtocolError::MissingPayload { event: event.as_str() })
}

fn invalid(event: EventName, reason: String) -> ProtocolError {
    ProtocolError::InvalidPayload { event: event.as_str(), reason }
}
