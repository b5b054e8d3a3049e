//! Presence payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Presence snapshot as sent by the gateway.
///
/// Values are signed on the wire so out-of-range input survives decoding; the
/// session layer clamps them. A field the gateway omitted is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    /// Participants currently in the room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_count: Option<i64>,
    /// Seconds until the room expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<i64>,
}

impl PresenceUpdate {
    /// Update carrying both fields.
    pub fn new(participant_count: i64, ttl_seconds: i64) -> Self {
        Self { participant_count: Some(participant_count), ttl_seconds: Some(ttl_seconds) }
    }

    /// Decode leniently. Missing or non-numeric fields become `None`.
    pub fn from_value(value: &Value) -> Self {
        let field = |key: &str| -> Option<i64> {
            match value.get(key) {
                Some(v) => {
                    let number = v.as_i64().or_else(|| v.as_f64().map(|f| f as i64));
                    if number.is_none() {
                        tracing::warn!(field = key, value = %v, "non-numeric presence field");
                    }
                    number
                },
                None => {
                    tracing::warn!(field = key, "missing presence field");
                    None
                },
            }
        };
        Self { participant_count: field("participantCount"), ttl_seconds: field("ttlSeconds") }
    }
}
