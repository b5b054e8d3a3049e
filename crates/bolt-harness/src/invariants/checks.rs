//! View checks registered by [`InvariantRegistry::standard`](super::InvariantRegistry::standard).

use bolt_core::ConnectionState;

use super::{AppView, Invariant, InvariantResult, Violation};

/// Message timestamps never decrease along the log.
pub struct MonotonicTimestamps;

impl Invariant for MonotonicTimestamps {
    fn name(&self) -> &'static str {
        "monotonic_timestamps"
    }

    fn check(&self, view: &AppView) -> InvariantResult {
        for (index, window) in view.messages.windows(2).enumerate() {
            if window[1].timestamp < window[0].timestamp {
                return Err(Violation::new(
                    self.name(),
                    format!(
                        "message {} at {} precedes message {} at {}",
                        index + 1,
                        window[1].timestamp,
                        index,
                        window[0].timestamp
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Displayed participant count never exceeds room capacity.
pub struct PresenceWithinCapacity;

impl Invariant for PresenceWithinCapacity {
    fn name(&self) -> &'static str {
        "presence_within_capacity"
    }

    fn check(&self, view: &AppView) -> InvariantResult {
        match view.presence {
            Some(p) if p.participant_count > view.capacity => Err(Violation::new(
                self.name(),
                format!("{} participants, capacity {}", p.participant_count, view.capacity),
            )),
            _ => Ok(()),
        }
    }
}

/// The countdown only runs once a presence snapshot exists.
pub struct CountdownRequiresPresence;

impl Invariant for CountdownRequiresPresence {
    fn name(&self) -> &'static str {
        "countdown_requires_presence"
    }

    fn check(&self, view: &AppView) -> InvariantResult {
        if view.countdown_running && view.presence.is_none() {
            return Err(Violation::new(self.name(), "countdown running without presence"));
        }
        Ok(())
    }
}

/// The composer cursor stays within its buffer.
pub struct CursorInBounds;

impl Invariant for CursorInBounds {
    fn name(&self) -> &'static str {
        "cursor_in_bounds"
    }

    fn check(&self, view: &AppView) -> InvariantResult {
        let len = view.buffer.chars().count();
        if view.cursor > len {
            return Err(Violation::new(
                self.name(),
                format!("cursor {} beyond buffer of {len} chars", view.cursor),
            ));
        }
        Ok(())
    }
}

/// A reconnect is only scheduled while no connection is active.
pub struct ReconnectOnlyWhenIdle;

impl Invariant for ReconnectOnlyWhenIdle {
    fn name(&self) -> &'static str {
        "reconnect_only_when_idle"
    }

    fn check(&self, view: &AppView) -> InvariantResult {
        let active =
            matches!(view.connection, ConnectionState::Connecting | ConnectionState::Connected);
        if view.reconnect_scheduled && active {
            return Err(Violation::new(
                self.name(),
                format!("reconnect scheduled while {:?}", view.connection),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bolt_core::{Message, MessageBody, Origin, PresenceSnapshot};

    use super::*;

    fn view() -> AppView {
        AppView {
            connection: ConnectionState::Connected,
            messages: Vec::new(),
            presence: None,
            capacity: 5,
            composer_mode: bolt_core::ComposerMode::PlainText,
            buffer: String::new(),
            cursor: 0,
            attach_menu_open: false,
            countdown_running: false,
            reconnect_scheduled: false,
            status: None,
        }
    }

    fn message(timestamp: u64) -> Message {
        Message {
            sender: "Ada".into(),
            body: MessageBody::Text("hi".into()),
            timestamp,
            origin: Origin::Confirmed,
            correlation_id: None,
        }
    }

    #[test]
    fn timestamps_out_of_order_violate() {
        let mut v = view();
        v.messages = vec![message(5), message(5), message(9)];
        assert!(MonotonicTimestamps.check(&v).is_ok());

        v.messages.push(message(3));
        let violation = MonotonicTimestamps.check(&v).unwrap_err();
        assert_eq!(violation.invariant, "monotonic_timestamps");
    }

    #[test]
    fn overfull_presence_violates() {
        let mut v = view();
        v.presence = Some(PresenceSnapshot { participant_count: 5, ttl_seconds_remaining: 1 });
        assert!(PresenceWithinCapacity.check(&v).is_ok());

        v.presence = Some(PresenceSnapshot { participant_count: 6, ttl_seconds_remaining: 1 });
        assert!(PresenceWithinCapacity.check(&v).is_err());
    }

    #[test]
    fn countdown_without_presence_violates() {
        let mut v = view();
        v.countdown_running = true;
        assert!(CountdownRequiresPresence.check(&v).is_err());
    }

    #[test]
    fn cursor_counts_chars_not_bytes() {
        let mut v = view();
        v.buffer = "héé".into();
        v.cursor = 3;
        assert!(CursorInBounds.check(&v).is_ok());
        v.cursor = 4;
        assert!(CursorInBounds.check(&v).is_err());
    }

    #[test]
    fn reconnect_while_connected_violates() {
        let mut v = view();
        v.reconnect_scheduled = true;
        assert!(ReconnectOnlyWhenIdle.check(&v).is_err());
        v.connection = ConnectionState::Disconnected;
        assert!(ReconnectOnlyWhenIdle.check(&v).is_ok());
    }
}
