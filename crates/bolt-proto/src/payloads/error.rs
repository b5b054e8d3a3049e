//! Error payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl ErrorPayload {
    /// Token was rejected.
    pub const UNAUTHORIZED: &'static str = "UNAUTHORIZED";
    /// Room already holds its maximum number of participants.
    pub const ROOM_FULL: &'static str = "ROOM_FULL";
    /// Room TTL elapsed.
    pub const ROOM_EXPIRED: &'static str = "ROOM_EXPIRED";
    /// Another participant already uses the display name.
    pub const NAME_CONFLICT: &'static str = "NAME_CONFLICT";
    /// Code used when the gateway sent none.
    pub const UNKNOWN: &'static str = "UNKNOWN";

    /// Create an error payload.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }

    /// Create a room full error.
    pub fn room_full() -> Self {
        Self::new(Self::ROOM_FULL, "room is full")
    }

    /// Create a room expired error.
    pub fn room_expired() -> Self {
        Self::new(Self::ROOM_EXPIRED, "room has expired")
    }

    /// Create an unauthorized error.
    pub fn unauthorized() -> Self {
        Self::new(Self::UNAUTHORIZED, "invalid session token")
    }

    /// Decode leniently. Numeric codes are stringified; absent fields are
    /// replaced with [`Self::UNKNOWN`] and an empty message.
    pub fn from_value(value: &Value) -> Self {
        let code = match value.get("code") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => Self::UNKNOWN.to_string(),
        };
        let message = match value {
            Value::String(s) => s.clone(),
            _ => value.get("message").and_then(Value::as_str).unwrap_or_default().to_string(),
        };
        Self { code, message }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numeric_codes_are_stringified() {
        let e = ErrorPayload::from_value(&json!({"code": 403, "message": "nope"}));
        assert_eq!(e, ErrorPayload::new("403", "nope"));
    }

    #[test]
    fn bare_string_is_message() {
        let e = ErrorPayload::from_value(&json!("room is full"));
        assert_eq!(e, ErrorPayload::new(ErrorPayload::UNKNOWN, "room is full"));
    }

    #[test]
    fn null_defaults() {
        let e = ErrorPayload::from_value(&Value::Null);
        assert_eq!(e, ErrorPayload::new(ErrorPayload::UNKNOWN, ""));
    }
}
