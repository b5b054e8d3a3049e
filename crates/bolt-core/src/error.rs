//! Error types for the session core.
//!
//! Failures of the logical gateway connection. Malformed payloads are not
//! errors at this layer: they are repaired or dropped during decoding.

use bolt_proto::ErrorPayload;
use thiserror::Error;

/// Errors that end a gateway connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Connection closed before the gateway admitted us (token rejected, room
    /// full or expired, or the gateway unreachable).
    #[error("join failed: {reason}")]
    JoinFailed {
        /// Close reason reported by the transport
        reason: String,
    },

    /// Connection dropped after a successful join
    #[error("connection lost: {reason}")]
    ConnectionLost {
        /// Close reason reported by the transport
        reason: String,
    },

    /// Gateway sent an `error` event
    #[error("gateway error {code}: {message}")]
    Rejected {
        /// Machine-readable code
        code: String,
        /// Human-readable description
        message: String,
    },

    /// Reconnect attempts exhausted
    #[error("gave up reconnecting after {attempts} attempts")]
    RetriesExhausted {
        /// Attempts made
        attempts: u32,
    },
}

impl ChannelError {
    /// Returns true if this error is transient and may succeed on reconnect.
    ///
    /// Only an abrupt loss of an admitted connection qualifies. Join failures
    /// and gateway errors are authoritative refusals.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionLost { .. })
    }
}

impl From<ErrorPayload> for ChannelError {
    fn from(err: ErrorPayload) -> Self {
        Self::Rejected { code: err.code, message: err.message }
    }
}
