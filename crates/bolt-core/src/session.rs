//! Conversation state.
//!
//! In-memory view of one room: the message log, the last presence snapshot
//! and the locally decremented TTL.
//!
//! # Invariants
//!
//! - Messages are appended in receipt order and never removed or reordered.
//! - Timestamps are non-decreasing along the log; an older timestamp is
//!   raised to the previous one on append.
//! - The only in-place change is promoting an optimistic message to confirmed
//!   when the gateway echoes its correlation id.
//! - Only a presence snapshot can raise the TTL; `tick` floors at zero.
//! - The sender of every message is non-empty, local ones included.

use std::collections::HashSet;

use bolt_proto::{InboundMessage, PresenceUpdate};

use crate::{
    message::{ANONYMOUS, CorrelationId, Message, MessageBody, Origin},
    presence::{PresenceSnapshot, ROOM_CAPACITY},
};

/// Result of applying an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Appended at this index
    Appended(usize),
    /// Echo of the optimistic message at this index, now confirmed
    Confirmed(usize),
}

/// Conversation state for one room.
#[derive(Debug, Clone)]
pub struct Session {
    display_name: String,
    capacity: u32,
    messages: Vec<Message>,
    presence: Option<PresenceSnapshot>,
    last_timestamp: u64,
    /// Whether the gateway has echoed at least one of our correlation ids.
    echoes_correlation: bool,
    /// Optimistic messages never handed to the transport.
    unsent: HashSet<CorrelationId>,
}

impl Session {
    /// Create an empty session for the local participant `display_name`.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self::with_capacity(display_name, ROOM_CAPACITY)
    }

    /// Create an empty session with a custom room capacity.
    ///
    /// A blank display name is replaced with [`ANONYMOUS`].
    pub fn with_capacity(display_name: impl Into<String>, capacity: u32) -> Self {
        let display_name = display_name.into().trim().to_string();
        let display_name = if display_name.is_empty() {
            tracing::warn!("blank display name, using {ANONYMOUS}");
            ANONYMOUS.to_string()
        } else {
            display_name
        };

        Self {
            display_name,
            capacity,
            messages: Vec::new(),
            presence: None,
            last_timestamp: 0,
            echoes_correlation: false,
            unsent: HashSet::new(),
        }
    }

    /// Local participant's display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Messages in receipt order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Last presence snapshot with the local countdown applied. `None` before
    /// the first snapshot.
    pub fn presence(&self) -> Option<PresenceSnapshot> {
        self.presence
    }

    /// Participants in the room. 0 before the first snapshot.
    pub fn participant_count(&self) -> u32 {
        self.presence.map_or(0, |p| p.participant_count)
    }

    /// Seconds until the room expires. `None` before the first snapshot.
    pub fn ttl_seconds_remaining(&self) -> Option<u64> {
        self.presence.map(|p| p.ttl_seconds_remaining)
    }

    /// Whether the room is known to have expired.
    pub fn is_expired(&self) -> bool {
        self.presence.is_some_and(|p| p.is_expired())
    }

    /// Whether the gateway has proven that it echoes correlation ids.
    pub fn echoes_correlation(&self) -> bool {
        self.echoes_correlation
    }

    /// Append a locally composed message before the gateway has seen it.
    ///
    /// The message counts as unsent until [`Session::mark_sent`].
    pub fn append_optimistic(
        &mut self,
        body: MessageBody,
        now_ms: u64,
        correlation_id: CorrelationId,
    ) -> &Message {
        let message = Message {
            sender: self.display_name.clone(),
            body,
            timestamp: self.stamp(now_ms),
            origin: Origin::LocalOptimistic,
            correlation_id: Some(correlation_id.clone()),
        };
        self.unsent.insert(correlation_id);
        self.push(message)
    }

    /// Apply a message delivered by the gateway.
    ///
    /// An echo whose correlation id matches a pending optimistic message
    /// confirms it in place. Anything else is appended as confirmed, so
    /// without a correlation id the optimistic copy and the echo both stay.
    pub fn apply_inbound(&mut self, inbound: InboundMessage, now_ms: u64) -> InboundOutcome {
        if let Some(id) = inbound.correlation_id.as_deref() {
            let pending = self.messages.iter().rposition(|m| {
                m.is_pending() && m.correlation_id.as_ref().is_some_and(|c| c.as_str() == id)
            });
            if let Some(index) = pending {
                self.messages[index].origin = Origin::Confirmed;
                self.echoes_correlation = true;
                self.unsent.retain(|c| c.as_str() != id);
                tracing::debug!(correlation_id = id, index, "optimistic message confirmed");
                return InboundOutcome::Confirmed(index);
            }
        }

        let mut message = Message::from_inbound(inbound, now_ms);
        message.timestamp = self.stamp(message.timestamp);
        self.push(message);
        InboundOutcome::Appended(self.messages.len() - 1)
    }

    /// Replace the presence snapshot. Returns true for the first snapshot.
    ///
    /// Fields missing from `update` keep their previous values.
    pub fn apply_presence(&mut self, update: PresenceUpdate) -> bool {
        let first = self.presence.is_none();
        let snapshot = PresenceSnapshot::from_update(update, self.presence, self.capacity);
        if snapshot.is_some() {
            self.presence = snapshot;
        }
        first && self.presence.is_some()
    }

    /// One second elapsed. Decrements the TTL, floored at zero.
    ///
    /// No-op before the first snapshot.
    pub fn tick(&mut self) {
        if let Some(presence) = self.presence.as_mut() {
            presence.ttl_seconds_remaining = presence.ttl_seconds_remaining.saturating_sub(1);
        }
    }

    /// Optimistic messages the gateway has not confirmed, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.is_pending())
    }

    /// Record that the optimistic message `id` was handed to the transport.
    pub fn mark_sent(&mut self, id: &CorrelationId) {
        self.unsent.remove(id);
    }

    /// Whether `message` is optimistic and was never handed to the transport.
    pub fn is_unsent(&self, message: &Message) -> bool {
        message.is_pending()
            && message.correlation_id.as_ref().is_some_and(|id| self.unsent.contains(id))
    }

    /// Whether `message` was authored under the local display name.
    pub fn is_self(&self, message: &Message) -> bool {
        message.origin == Origin::LocalOptimistic || message.sender == self.display_name
    }

    fn stamp(&mut self, timestamp: u64) -> u64 {
        self.last_timestamp = self.last_timestamp.max(timestamp);
        self.last_timestamp
    }

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        let index = self.messages.len() - 1;
        &self.messages[index]
    }
}
