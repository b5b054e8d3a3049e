//! Transport errors.

use std::{io, time::Duration};

use thiserror::Error;

/// Errors opening or running a gateway connection.
///
/// These never reach the session core directly: the connector turns them into
/// a close reason on [`ChannelEvent::Closed`](bolt_core::ChannelEvent::Closed).
#[derive(Debug, Error)]
pub enum TransportError {
    /// Gateway URL could not be turned into a handshake request.
    #[error("invalid gateway url: {0}")]
    InvalidUrl(String),

    /// Token contains characters not allowed in a header.
    #[error("token is not a valid header value")]
    InvalidToken,

    /// Handshake did not complete in time.
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    /// TCP connection failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// WebSocket handshake or stream failure.
    #[error("websocket error: {0}")]
    WebSocket(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(err.to_string())
    }
}
