//! Fuzz target for gateway frame decoding
//!
//! Feeds arbitrary text through the whole inbound path a client applies to
//! a WebSocket message: envelope decoding, payload classification, the
//! lenient `newMessage` / `presenceUpdate` / `error` readers and message
//! normalization.
//!
//! # Invariants
//!
//! - NEVER panic on malformed input
//! - Normalized messages always have a non-empty sender
//! - Presence counts stay within room capacity after clamping

#![no_main]

use bolt_core::{Message, PresenceSnapshot, ROOM_CAPACITY};
use bolt_proto::{ErrorPayload, Frame, InboundMessage, Payload, PresenceUpdate};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(frame) = Frame::decode(text) else {
        return;
    };

    let _ = frame.encode();
    let _ = Payload::from_frame(&frame);

    if let Some(value) = &frame.data {
        let message = Message::from_inbound(InboundMessage::from_value(value), 0);
        assert!(!message.sender.is_empty());

        let update = PresenceUpdate::from_value(value);
        if let Some(presence) = PresenceSnapshot::from_update(update, None, ROOM_CAPACITY) {
            assert!(presence.participant_count <= ROOM_CAPACITY);
        }

        let _ = ErrorPayload::from_value(value);
    }
});
