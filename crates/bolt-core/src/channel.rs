//! Transport channel state machine.
//!
//! Owns the single logical connection to the session gateway. Uses the action
//! pattern: methods return [`ChannelAction`]s for the driver to execute and
//! consume [`ChannelEvent`]s reported back by it. No I/O happens here.
//!
//! # State Machine
//!
//! ```text
//! Disconnected ──connect──────────────> Connecting
//! Connecting   ──opened(gen)──────────> Connected   (sends join)
//! Connecting   ──closed────────────────> Errored      (Disconnected on reconnect)
//! Connected    ──closed before admit──> Errored      (Disconnected on reconnect)
//! Connected    ──closed after admit───> Disconnected (retryable)
//! Connected    ──error event──────────> Errored
//! any          ──disconnect───────────> Disconnected
//! ```
//!
//! The gateway admits the client by sending its first room event
//! (presence or message) after `join`.
//!
//! # Generations
//!
//! Every `connect` starts a new generation and the driver tags inbound events
//! with the generation they were opened under. Events from any other
//! generation are stale and dropped, so nothing from a torn-down connection
//! ever reaches the session.

use bolt_proto::{ErrorPayload, Frame, InboundMessage, Payload, PresenceUpdate, ProtocolError};

use crate::error::ChannelError;

/// Connection generation counter.
pub type Generation = u64;

/// Connection state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection
    #[default]
    Disconnected,
    /// Socket requested, not yet open
    Connecting,
    /// Socket open and `join` sent
    Connected,
    /// Connection ended with a non-retryable failure
    Errored(ChannelError),
}

/// Events reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Socket opened
    Opened {
        /// Generation the socket was opened under
        generation: Generation,
    },
    /// Frame received
    FrameReceived {
        /// Generation the socket was opened under
        generation: Generation,
        /// Decoded envelope
        frame: Frame,
    },
    /// Socket closed or failed to open
    Closed {
        /// Generation the socket was opened under
        generation: Generation,
        /// Close reason or transport error
        reason: String,
    },
}

impl ChannelEvent {
    /// Generation this event belongs to.
    pub fn generation(&self) -> Generation {
        match self {
            Self::Opened { generation }
            | Self::FrameReceived { generation, .. }
            | Self::Closed { generation, .. } => *generation,
        }
    }
}

/// Server events delivered to the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Chat message
    Message(InboundMessage),
    /// Presence snapshot
    Presence(PresenceUpdate),
    /// Gateway error; the connection is already being closed
    Error(ErrorPayload),
}

/// Actions returned by the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelAction {
    /// Open a socket authenticated with `token`
    Open {
        /// Generation to tag the socket's events with
        generation: Generation,
        /// Opaque session token
        token: String,
    },
    /// Send this frame on the open socket
    Send(Frame),
    /// Close the socket opened under `generation`
    Close {
        /// Generation of the socket to close
        generation: Generation,
    },
    /// Hand a server event to the session layer
    Deliver(Inbound),
    /// Connection ended without a `disconnect` call
    Lost(ChannelError),
}

/// Transport channel state machine.
#[derive(Debug, Clone, Default)]
pub struct Channel {
    state: ConnectionState,
    generation: Generation,
    token: Option<String>,
    /// Whether the gateway has sent a room event on the current connection.
    admitted: bool,
    /// Whether the current connection came from `reconnect` and is not yet
    /// admitted. A join failure then leaves the channel retryable.
    retrying: bool,
}

impl Channel {
    /// Create a disconnected channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Current generation.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Whether frames can be sent.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Whether the gateway has admitted us on the current connection.
    pub fn is_admitted(&self) -> bool {
        self.admitted
    }

    /// Token of the last `connect` call.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Open a connection authenticated with `token`.
    ///
    /// No-op while connecting or connected.
    pub fn connect(&mut self, token: impl Into<String>) -> Vec<ChannelAction> {
        if matches!(self.state, ConnectionState::Connecting | ConnectionState::Connected) {
            tracing::debug!(state = ?self.state, "connect ignored, already active");
            return vec![];
        }

        let token = token.into();
        self.token = Some(token.clone());
        self.generation += 1;
        self.state = ConnectionState::Connecting;
        self.admitted = false;
        self.retrying = false;
        tracing::info!(generation = self.generation, "connecting");

        vec![ChannelAction::Open { generation: self.generation, token }]
    }

    /// Reconnect with the token of the last `connect` call.
    ///
    /// No-op if `connect` was never called.
    pub fn reconnect(&mut self) -> Vec<ChannelAction> {
        let Some(token) = self.token.clone() else {
            return vec![];
        };
        let actions = self.connect(token);
        if !actions.is_empty() {
            self.retrying = true;
        }
        actions
    }

    /// Tear down the connection, if any. Safe to call repeatedly.
    pub fn disconnect(&mut self) -> Vec<ChannelAction> {
        let previous = std::mem::take(&mut self.state);
        self.admitted = false;
        self.retrying = false;

        match previous {
            ConnectionState::Connecting | ConnectionState::Connected => {
                let generation = self.generation;
                self.generation += 1;
                tracing::info!(generation, "disconnecting");
                vec![ChannelAction::Close { generation }]
            },
            ConnectionState::Disconnected | ConnectionState::Errored(_) => vec![],
        }
    }

    /// Mark the channel as failed for good (e.g. reconnects exhausted).
    pub fn fail(&mut self, error: ChannelError) {
        tracing::error!(%error, "channel failed");
        self.state = ConnectionState::Errored(error);
        self.admitted = false;
        self.retrying = false;
    }

    /// Send a payload. Dropped when not connected.
    pub fn send(&mut self, payload: Payload) -> Vec<ChannelAction> {
        if !self.is_connected() {
            tracing::debug!(event = %payload.event(), state = ?self.state, "dropping send");
            return vec![];
        }

        match payload.into_frame() {
            Ok(frame) => vec![ChannelAction::Send(frame)],
            Err(error) => {
                tracing::error!(%error, "failed to encode payload");
                vec![]
            },
        }
    }

    /// Process a driver event.
    pub fn handle(&mut self, event: ChannelEvent) -> Vec<ChannelAction> {
        if event.generation() != self.generation {
            tracing::debug!(
                event_generation = event.generation(),
                current = self.generation,
                "dropping stale channel event"
            );
            return vec![];
        }

        match event {
            ChannelEvent::Opened { generation } => {
                if self.state != ConnectionState::Connecting {
                    tracing::warn!(state = ?self.state, "unexpected open");
                    return vec![];
                }
                self.state = ConnectionState::Connected;
                tracing::info!(generation, "connected, joining");
                self.send(Payload::Join)
            },
            ChannelEvent::FrameReceived { frame, .. } => self.handle_frame(&frame),
            ChannelEvent::Closed { generation, reason } => {
                if !matches!(self.state, ConnectionState::Connecting | ConnectionState::Connected) {
                    return vec![];
                }
                self.generation += 1;

                let error = if self.admitted {
                    tracing::warn!(generation, %reason, "connection lost");
                    self.state = ConnectionState::Disconnected;
                    ChannelError::ConnectionLost { reason }
                } else if self.retrying {
                    tracing::warn!(generation, %reason, "reconnect attempt failed");
                    self.state = ConnectionState::Disconnected;
                    ChannelError::JoinFailed { reason }
                } else {
                    let error = ChannelError::JoinFailed { reason };
                    tracing::error!(generation, %error, "connection closed before join");
                    self.state = ConnectionState::Errored(error.clone());
                    error
                };
                self.admitted = false;
                self.retrying = false;

                vec![ChannelAction::Lost(error)]
            },
        }
    }

    fn handle_frame(&mut self, frame: &Frame) -> Vec<ChannelAction> {
        if !self.is_connected() {
            tracing::debug!(event = %frame.event, "frame before open, ignoring");
            return vec![];
        }

        match Payload::from_frame(frame) {
            Ok(Payload::NewMessage(message)) => {
                self.admitted = true;
                self.retrying = false;
                vec![ChannelAction::Deliver(Inbound::Message(message))]
            },
            Ok(Payload::PresenceUpdate(update)) => {
                self.admitted = true;
                self.retrying = false;
                vec![ChannelAction::Deliver(Inbound::Presence(update))]
            },
            Ok(Payload::Error(error)) => {
                let generation = self.generation;
                self.generation += 1;
                self.admitted = false;
                self.retrying = false;
                let failure = ChannelError::from(error.clone());
                tracing::error!(generation, %failure, "gateway error");
                self.state = ConnectionState::Errored(failure);

                vec![ChannelAction::Deliver(Inbound::Error(error)), ChannelAction::Close {
                    generation,
                }]
            },
            Ok(payload @ (Payload::Join | Payload::SendMessage(_) | Payload::LegacySendMessage(_))) => {
                tracing::warn!(event = %payload.event(), "client event received from gateway");
                vec![]
            },
            Err(ProtocolError::UnknownEvent(event)) => {
                tracing::debug!(%event, "ignoring unknown event");
                vec![]
            },
            Err(error) => {
                tracing::warn!(%error, "dropping malformed frame");
                vec![]
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use bolt_proto::{EventName, SendMessage, MessageKind};
    use serde_json::json;

    use super::*;

    fn connected() -> Channel {
        let mut channel = Channel::new();
        channel.connect("abc");
        channel.handle(ChannelEvent::Opened { generation: channel.generation() });
        channel
    }

    fn frame(event: &str, data: serde_json::Value) -> ChannelEvent {
        ChannelEvent::FrameReceived {
            generation: 1,
            frame: Frame { event: event.into(), data: Some(data) },
        }
    }

    #[test]
    fn connect_opens_then_joins() {
        let mut channel = Channel::new();
        let actions = channel.connect("abc");
        assert_eq!(actions, vec![ChannelAction::Open { generation: 1, token: "abc".into() }]);
        assert_eq!(channel.state(), &ConnectionState::Connecting);

        let actions = channel.handle(ChannelEvent::Opened { generation: 1 });
        assert_eq!(actions, vec![ChannelAction::Send(Frame::new(EventName::Join, None))]);
        assert!(channel.is_connected());
        assert!(!channel.is_admitted());
    }

    #[test]
    fn connect_is_idempotent() {
        let mut channel = Channel::new();
        channel.connect("abc");
        assert!(channel.connect("abc").is_empty());
        assert_eq!(channel.generation(), 1);

        channel.handle(ChannelEvent::Opened { generation: 1 });
        assert!(channel.connect("other").is_empty());
        assert_eq!(channel.token(), Some("abc"));
    }

    #[test]
    fn disconnect_is_idempotent_and_allows_reconnect() {
        let mut channel = connected();
        assert_eq!(channel.disconnect(), vec![ChannelAction::Close { generation: 1 }]);
        assert!(channel.disconnect().is_empty());
        assert_eq!(channel.state(), &ConnectionState::Disconnected);

        let actions = channel.connect("abc");
        assert_eq!(actions, vec![ChannelAction::Open { generation: 3, token: "abc".into() }]);
    }

    #[test]
    fn send_dropped_when_not_connected() {
        let mut channel = Channel::new();
        assert!(channel.send(Payload::LegacySendMessage("hi".into())).is_empty());

        channel.connect("abc");
        assert!(channel.send(Payload::LegacySendMessage("hi".into())).is_empty());
    }

    #[test]
    fn send_when_connected() {
        let mut channel = connected();
        let payload = Payload::SendMessage(SendMessage {
            kind: MessageKind::Text,
            content: "hi".into(),
            image_ref: None,
            correlation_id: None,
        });
        let actions = channel.send(payload.clone());
        let Some(ChannelAction::Send(frame)) = actions.first() else {
            panic!("expected send, got {actions:?}");
        };
        assert_eq!(Payload::from_frame(frame).unwrap(), payload);
    }

    #[test]
    fn stale_events_are_dropped() {
        let mut channel = connected();
        channel.disconnect();
        channel.connect("abc");

        let stale = channel.handle(frame("newMessage", json!({"sender": "Ada", "message": "x"})));
        assert!(stale.is_empty());

        let stale = channel.handle(ChannelEvent::Closed { generation: 1, reason: "gone".into() });
        assert!(stale.is_empty());
        assert_eq!(channel.state(), &ConnectionState::Connecting);
    }

    #[test]
    fn server_events_are_delivered_and_admit() {
        let mut channel = connected();
        let actions = channel.handle(frame("presenceUpdate", json!({"participantCount": 3, "ttlSeconds": 120})));
        assert_eq!(actions, vec![ChannelAction::Deliver(Inbound::Presence(PresenceUpdate::new(3, 120)))]);
        assert!(channel.is_admitted());

        let actions = channel.handle(frame("newMessage", json!({"sender": "Ada", "message": "hello"})));
        assert!(matches!(&actions[..], [ChannelAction::Deliver(Inbound::Message(m))] if m.content == "hello"));
    }

    #[test]
    fn gateway_error_is_terminal() {
        let mut channel = connected();
        let actions = channel.handle(frame("error", json!({"code": "ROOM_FULL", "message": "room is full"})));
        assert_eq!(actions, vec![
            ChannelAction::Deliver(Inbound::Error(ErrorPayload::new("ROOM_FULL", "room is full"))),
            ChannelAction::Close { generation: 1 },
        ]);
        assert!(matches!(channel.state(), ConnectionState::Errored(ChannelError::Rejected { .. })));

        let late = channel.handle(frame("presenceUpdate", json!({"participantCount": 1, "ttlSeconds": 1})));
        assert!(late.is_empty());
    }

    #[test]
    fn close_before_join_is_join_failure() {
        let mut channel = Channel::new();
        channel.connect("bad");
        let actions = channel.handle(ChannelEvent::Closed { generation: 1, reason: "401".into() });
        let error = ChannelError::JoinFailed { reason: "401".into() };
        assert_eq!(actions, vec![ChannelAction::Lost(error.clone())]);
        assert_eq!(channel.state(), &ConnectionState::Errored(error));
    }

    #[test]
    fn close_after_join_is_transient() {
        let mut channel = connected();
        channel.handle(frame("presenceUpdate", json!({"participantCount": 1, "ttlSeconds": 60})));
        let actions = channel.handle(ChannelEvent::Closed { generation: 1, reason: "reset".into() });
        assert_eq!(actions, vec![ChannelAction::Lost(ChannelError::ConnectionLost {
            reason: "reset".into()
        })]);
        assert_eq!(channel.state(), &ConnectionState::Disconnected);

        let actions = channel.reconnect();
        assert_eq!(actions, vec![ChannelAction::Open { generation: 3, token: "abc".into() }]);
    }

    #[test]
    fn unknown_and_malformed_frames_are_ignored() {
        let mut channel = connected();
        assert!(channel.handle(frame("typing", json!({}))).is_empty());
        let missing = ChannelEvent::FrameReceived {
            generation: 1,
            frame: Frame { event: "presenceUpdate".into(), data: None },
        };
        assert!(channel.handle(missing).is_empty());
        assert!(channel.is_connected());
    }

    #[test]
    fn failed_reconnect_attempt_stays_retryable() {
        let mut channel = connected();
        channel.handle(frame("presenceUpdate", json!({"participantCount": 1, "ttlSeconds": 60})));
        channel.handle(ChannelEvent::Closed { generation: 1, reason: "reset".into() });

        channel.reconnect();
        let actions = channel.handle(ChannelEvent::Closed { generation: 3, reason: "refused".into() });
        assert_eq!(actions, vec![ChannelAction::Lost(ChannelError::JoinFailed {
            reason: "refused".into()
        })]);
        assert_eq!(channel.state(), &ConnectionState::Disconnected);

        let actions = channel.reconnect();
        assert_eq!(actions, vec![ChannelAction::Open { generation: 5, token: "abc".into() }]);
    }

    #[test]
    fn reconnect_without_token_is_noop() {
        let mut channel = Channel::new();
        assert!(channel.reconnect().is_empty());
    }
}
