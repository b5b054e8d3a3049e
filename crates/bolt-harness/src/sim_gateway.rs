//! Model session gateway.
//!
//! A pure, synchronous model of the Bolt gateway: token admission, room
//! capacity, TTL and message fan-out. It performs no I/O. Callers feed it
//! frames and route the returned [`GatewayOutput`]s, either in memory
//! ([`crate::SimNetwork`]) or over simulated WebSockets
//! ([`crate::WsGateway`]).

use std::collections::{BTreeMap, HashMap};

use bolt_core::ROOM_CAPACITY;
use bolt_proto::{ErrorPayload, Frame, InboundMessage, Payload, PresenceUpdate};

use crate::sim_env::DEFAULT_EPOCH_MS;

/// Gateway-assigned connection identifier.
pub type ConnId = u64;

/// Default room lifetime in seconds.
pub const DEFAULT_TTL_SECONDS: u64 = 600;

/// Gateway behavior knobs.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Maximum joined participants
    pub capacity: u32,
    /// Room lifetime in seconds
    pub ttl_seconds: u64,
    /// Whether echoes carry the sender's correlation id
    pub echo_correlation: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { capacity: ROOM_CAPACITY, ttl_seconds: DEFAULT_TTL_SECONDS, echo_correlation: true }
    }
}

/// Instruction for whoever carries the gateway's traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutput {
    /// Deliver a frame to one connection
    Send {
        /// Recipient
        to: ConnId,
        /// Frame
        frame: Frame,
    },
    /// Close one connection
    Close {
        /// Connection to close
        conn: ConnId,
        /// Close reason
        reason: String,
    },
}

#[derive(Debug, Clone)]
struct Participant {
    name: String,
    joined: bool,
}

/// Model gateway state.
#[derive(Debug, Clone)]
pub struct SimGateway {
    config: GatewayConfig,
    tokens: HashMap<String, String>,
    connections: BTreeMap<ConnId, Participant>,
    next_conn: ConnId,
    ttl_seconds_remaining: u64,
    clock_ms: u64,
    history: Vec<InboundMessage>,
    received: Vec<(ConnId, Frame)>,
}

impl Default for SimGateway {
    fn default() -> Self {
        Self::new(GatewayConfig::default())
    }
}

impl SimGateway {
    /// Create a gateway with no registered tokens.
    pub fn new(config: GatewayConfig) -> Self {
        let ttl_seconds_remaining = config.ttl_seconds;
        Self {
            config,
            tokens: HashMap::new(),
            connections: BTreeMap::new(),
            next_conn: 1,
            ttl_seconds_remaining,
            clock_ms: DEFAULT_EPOCH_MS,
            history: Vec::new(),
            received: Vec::new(),
        }
    }

    /// Register `token` for the participant `name`.
    #[must_use]
    pub fn with_participant(mut self, token: impl Into<String>, name: impl Into<String>) -> Self {
        self.register(token, name);
        self
    }

    /// Register `token` for the participant `name`.
    pub fn register(&mut self, token: impl Into<String>, name: impl Into<String>) {
        self.tokens.insert(token.into(), name.into());
    }

    /// Whether `token` belongs to a registered participant.
    pub fn authorize(&self, token: &str) -> bool {
        self.tokens.contains_key(token)
    }

    /// Accept a socket authenticated with `token`.
    ///
    /// # Errors
    ///
    /// Returns the unauthorized error payload for unknown tokens.
    pub fn accept(&mut self, token: &str) -> Result<ConnId, ErrorPayload> {
        let name = self.tokens.get(token).cloned().ok_or_else(ErrorPayload::unauthorized)?;
        let conn = self.next_conn;
        self.next_conn += 1;
        self.connections.insert(conn, Participant { name, joined: false });
        tracing::debug!(conn, "gateway accepted socket");
        Ok(conn)
    }

    /// Process a frame sent by `conn`.
    pub fn handle_frame(&mut self, conn: ConnId, frame: &Frame) -> Vec<GatewayOutput> {
        let Some(participant) = self.connections.get(&conn) else {
            return vec![];
        };
        let name = participant.name.clone();
        let joined = participant.joined;
        self.received.push((conn, frame.clone()));

        match Payload::from_frame(frame) {
            Ok(Payload::Join) => self.join(conn),
            Ok(Payload::SendMessage(mut message)) if joined => {
                if !self.config.echo_correlation {
                    message.correlation_id = None;
                }
                let inbound = InboundMessage::from_send(name, message, self.clock_ms);
                self.broadcast_message(inbound)
            },
            Ok(Payload::LegacySendMessage(text)) if joined => {
                let mut inbound = InboundMessage::from_legacy_text(Some(name), &text);
                inbound.timestamp = Some(self.clock_ms);
                self.broadcast_message(inbound)
            },
            Ok(payload) => {
                tracing::warn!(conn, event = %payload.event(), joined, "gateway ignoring frame");
                vec![]
            },
            Err(error) => {
                tracing::warn!(conn, %error, "gateway received malformed frame");
                vec![]
            },
        }
    }

    /// Forget `conn`. Remaining participants get fresh presence if it had
    /// joined.
    pub fn disconnect(&mut self, conn: ConnId) -> Vec<GatewayOutput> {
        match self.connections.remove(&conn) {
            Some(participant) if participant.joined => self.broadcast_presence(),
            _ => vec![],
        }
    }

    /// Drop every socket without warning.
    pub fn drop_all(&mut self, reason: &str) -> Vec<GatewayOutput> {
        let conns: Vec<_> = self.connections.keys().copied().collect();
        self.connections.clear();
        conns.into_iter().map(|conn| GatewayOutput::Close { conn, reason: reason.into() }).collect()
    }

    /// Deliver a message from a participant that is not simulated as a
    /// client.
    pub fn announce(&mut self, sender: &str, content: &str) -> Vec<GatewayOutput> {
        let inbound = InboundMessage {
            sender: Some(sender.into()),
            content: content.into(),
            timestamp: Some(self.clock_ms),
            ..InboundMessage::default()
        };
        self.broadcast_message(inbound)
    }

    /// Send a raw frame to every joined participant.
    pub fn broadcast_frame(&self, frame: &Frame) -> Vec<GatewayOutput> {
        self.joined().map(|to| GatewayOutput::Send { to, frame: frame.clone() }).collect()
    }

    /// Advance the room clock by one second.
    pub fn tick(&mut self) {
        self.ttl_seconds_remaining = self.ttl_seconds_remaining.saturating_sub(1);
        self.clock_ms += 1_000;
    }

    /// Expire the room: every joined participant gets an error and is
    /// closed.
    pub fn expire(&mut self) -> Vec<GatewayOutput> {
        self.ttl_seconds_remaining = 0;
        let frame = error_frame(ErrorPayload::room_expired());
        let mut out = Vec::new();
        for conn in self.joined().collect::<Vec<_>>() {
            out.extend(frame.iter().cloned().map(|frame| GatewayOutput::Send { to: conn, frame }));
            out.push(GatewayOutput::Close { conn, reason: "room expired".into() });
            self.connections.remove(&conn);
        }
        out
    }

    /// Set the clock used for message timestamps.
    pub fn set_clock(&mut self, ms: u64) {
        self.clock_ms = ms;
    }

    /// Joined participants.
    pub fn participant_count(&self) -> usize {
        self.joined().count()
    }

    /// Seconds until the room expires.
    pub fn ttl_seconds_remaining(&self) -> u64 {
        self.ttl_seconds_remaining
    }

    /// Every message the gateway has broadcast, in order.
    pub fn history(&self) -> &[InboundMessage] {
        &self.history
    }

    /// Every frame received from a client, in order.
    pub fn received(&self) -> &[(ConnId, Frame)] {
        &self.received
    }

    fn join(&mut self, conn: ConnId) -> Vec<GatewayOutput> {
        let rejection = if self.ttl_seconds_remaining == 0 {
            Some(ErrorPayload::room_expired())
        } else if self.participant_count() >= self.config.capacity as usize {
            Some(ErrorPayload::room_full())
        } else {
            None
        };

        if let Some(error) = rejection {
            tracing::debug!(conn, code = %error.code, "gateway rejecting join");
            self.connections.remove(&conn);
            let mut out: Vec<_> = error_frame(error)
                .into_iter()
                .map(|frame| GatewayOutput::Send { to: conn, frame })
                .collect();
            out.push(GatewayOutput::Close { conn, reason: "join rejected".into() });
            return out;
        }

        if let Some(participant) = self.connections.get_mut(&conn) {
            participant.joined = true;
        }
        self.broadcast_presence()
    }

    fn broadcast_message(&mut self, inbound: InboundMessage) -> Vec<GatewayOutput> {
        self.history.push(inbound.clone());
        match Payload::NewMessage(inbound).into_frame() {
            Ok(frame) => self.broadcast_frame(&frame),
            Err(error) => {
                tracing::error!(%error, "gateway failed to encode message");
                vec![]
            },
        }
    }

    fn broadcast_presence(&self) -> Vec<GatewayOutput> {
        let update = PresenceUpdate::new(
            self.participant_count() as i64,
            self.ttl_seconds_remaining as i64,
        );
        match Payload::PresenceUpdate(update).into_frame() {
            Ok(frame) => self.broadcast_frame(&frame),
            Err(error) => {
                tracing::error!(%error, "gateway failed to encode presence");
                vec![]
            },
        }
    }

    fn joined(&self) -> impl Iterator<Item = ConnId> + '_ {
        self.connections.iter().filter(|(_, p)| p.joined).map(|(conn, _)| *conn)
    }
}

fn error_frame(error: ErrorPayload) -> Option<Frame> {
    Payload::Error(error).into_frame().ok()
}
