//! JSON envelope carried in each WebSocket text message.
//!
//! A `Frame` is the transport-layer packet: an event name plus an optional,
//! still-untyped JSON payload. For typed access see [`crate::Payload`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    EventName,
    errors::{ProtocolError, Result},
};

/// Transport envelope.
///
/// Layout on the wire: `{"event": "<name>", "data": <payload>}`. `data` is
/// omitted for payload-less events such as `join`.
///
/// # Invariants
///
/// - Size Limit: the encoded text MUST NOT exceed [`Frame::MAX_SIZE`]. Oversize
///   frames are rejected on both encode and decode.
/// - The event name is kept verbatim so unknown events can be logged and
///   skipped by the receiver instead of tearing down the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Event wire name.
    pub event: String,

    /// Raw payload. `None` if the event carries no data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Frame {
    /// Maximum encoded frame size (1 MiB).
    pub const MAX_SIZE: usize = 1024 * 1024;

    /// Create a frame for a known event.
    #[must_use]
    pub fn new(event: EventName, data: Option<Value>) -> Self {
        Self { event: event.as_str().to_string(), data }
    }

    /// Known event for this frame. `None` if the name is not recognized.
    #[must_use]
    pub fn event_name(&self) -> Option<EventName> {
        EventName::from_wire(&self.event)
    }

    /// Encode as JSON text.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Encode` if serialization fails
    /// - `ProtocolError::FrameTooLarge` if the result exceeds `MAX_SIZE`
    pub fn encode(&self) -> Result<String> {
        let text = serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))?;
        if text.len() > Self::MAX_SIZE {
            return Err(ProtocolError::FrameTooLarge { size: text.len(), max: Self::MAX_SIZE });
        }
        Ok(text)
    }

    /// Decode from JSON text.
    ///
    /// The size check runs before parsing.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooLarge` if `text` exceeds `MAX_SIZE`
    /// - `ProtocolError::MalformedFrame` if `text` is not an envelope object
    pub fn decode(text: &str) -> Result<Self> {
        if text.len() > Self::MAX_SIZE {
            return Err(ProtocolError::FrameTooLarge { size: text.len(), max: Self::MAX_SIZE });
        }
        Ok(serde_json::from_str(text)?)
    }
}
