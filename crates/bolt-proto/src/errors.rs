//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding wire frames.
///
/// These are structural failures only. Payloads that parse but carry odd
/// values (negative counts, unknown kinds) are repaired by the decoder instead
/// of being rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame text is not valid JSON or not an envelope object.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Frame exceeds [`crate::Frame::MAX_SIZE`].
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Actual encoded size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Event name is not part of the protocol.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Event requires a payload but the frame carried none.
    #[error("missing payload for event {event}")]
    MissingPayload {
        /// Event wire name
        event: &'static str,
    },

    /// Payload has the wrong JSON type for its event.
    #[error("invalid payload for event {event}: {reason}")]
    InvalidPayload {
        /// Event wire name
        event: &'static str,
        /// What was wrong
        reason: String,
    },

    /// Serialization failed.
    #[error("JSON encode failed: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedFrame(err.to_string())
    }
}
