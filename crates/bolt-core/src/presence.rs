//! Presence and time-to-live.
//!
//! The gateway is authoritative for both values. The client only decrements
//! the TTL locally, once per second, between snapshots.

use bolt_proto::PresenceUpdate;

/// Maximum participants per room.
pub const ROOM_CAPACITY: u32 = 5;

/// Last presence snapshot received from the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresenceSnapshot {
    /// Participants in the room, within `[0, capacity]`
    pub participant_count: u32,
    /// Seconds until the room expires
    pub ttl_seconds_remaining: u64,
}

impl PresenceSnapshot {
    /// Build a snapshot from a wire update, clamping out-of-range values.
    ///
    /// Counts outside `[0, capacity]` and negative TTLs are logged and
    /// clamped rather than rejected. A field the update omits keeps its value
    /// from `previous`. Without a previous snapshot a missing count is 0 and a
    /// missing TTL leaves nothing to count down, so `None` is returned.
    pub fn from_update(
        update: PresenceUpdate,
        previous: Option<Self>,
        capacity: u32,
    ) -> Option<Self> {
        let participant_count = match update.participant_count {
            Some(received) => {
                let count = received.clamp(0, i64::from(capacity)) as u32;
                if i64::from(count) != received {
                    tracing::warn!(received, capacity, "participant count out of range, clamping");
                }
                count
            },
            None => previous.map_or(0, |p| p.participant_count),
        };

        let ttl_seconds_remaining = match (update.ttl_seconds, previous) {
            (Some(received), _) if received < 0 => {
                tracing::warn!(received, "negative ttl, clamping to 0");
                0
            },
            (Some(received), _) => received as u64,
            (None, Some(previous)) => previous.ttl_seconds_remaining,
            (None, None) => {
                tracing::warn!("first presence update without ttl, ignoring");
                return None;
            },
        };

        Some(Self { participant_count, ttl_seconds_remaining })
    }

    /// Whether the room has expired according to this snapshot.
    pub fn is_expired(&self) -> bool {
        self.ttl_seconds_remaining == 0
    }
}

/// Render seconds as `HH:MM:SS`. Hours are not wrapped.
pub fn format_remaining(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}
