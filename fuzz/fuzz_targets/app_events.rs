//! Fuzz target for the App state machine
//!
//! Drive the app with arbitrary user input, timer events and transport
//! notifications from current and stale connection generations.
//!
//! # Strategy
//!
//! - Keys and pasted text in both composer modes
//! - Gateway frames with out-of-range presence values and odd message shapes
//! - Opens and closes tagged with random generations
//! - Ticks and reconnect deadlines at arbitrary points
//!
//! # Invariants
//!
//! - NEVER panic
//! - The message log only grows
//! - Every registered app invariant holds after each event

#![no_main]

use arbitrary::Arbitrary;
use bolt_app::{App, AppEvent, KeyInput};
use bolt_core::{ChannelEvent, SessionConfig};
use bolt_harness::{AppView, InvariantRegistry, SimEnv};
use bolt_proto::{Frame, ImageRef};
use libfuzzer_sys::fuzz_target;
use serde_json::json;

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Key(Key),
    Text(String),
    Submit,
    Attach,
    InsertCode,
    CancelCode,
    ClearDraft,
    PickImage { name: String },
    Tick,
    ReconnectDue,
    Opened { generation: u8 },
    Closed { generation: u8 },
    Presence { generation: u8, count: i64, ttl: i64 },
    Message { generation: u8, sender: Option<String>, kind: Option<String>, content: String },
    Error { generation: u8, code: String },
    Advance { millis: u16 },
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Key {
    Char(char),
    Enter { shift: bool },
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    Tab,
    Esc,
}

fuzz_target!(|ops: Vec<Op>| {
    let env = SimEnv::new();
    let mut app = App::new(env.clone(), SessionConfig::default(), "Ada", "abc");
    let invariants = InvariantRegistry::standard();
    let _ = app.connect();

    let mut logged = 0;
    for op in ops {
        if let Op::Advance { millis } = op {
            env.advance(u64::from(millis));
            continue;
        }
        let _ = app.handle(to_event(op));

        let len = app.session().messages().len();
        assert!(len >= logged, "message log shrank from {logged} to {len}");
        logged = len;

        if let Err(violations) = invariants.check_all(&AppView::capture(&app)) {
            panic!("invariants violated: {violations:?}");
        }
    }
});

fn to_event(op: Op) -> AppEvent {
    match op {
        Op::Key(key) => AppEvent::Key(to_key(key)),
        Op::Text(text) => AppEvent::InsertText(text),
        Op::Submit => AppEvent::Submit,
        Op::Attach => AppEvent::ToggleAttachMenu,
        Op::InsertCode => AppEvent::InsertCode,
        Op::CancelCode => AppEvent::CancelCode,
        Op::ClearDraft => AppEvent::ClearDraft,
        Op::PickImage { name } => AppEvent::PickImage(ImageRef::new(format!("file:///{name}"), name)),
        Op::Tick | Op::Advance { .. } => AppEvent::Tick,
        Op::ReconnectDue => AppEvent::ReconnectDue,
        Op::Opened { generation } => {
            AppEvent::Transport(ChannelEvent::Opened { generation: u64::from(generation) })
        },
        Op::Closed { generation } => AppEvent::Transport(ChannelEvent::Closed {
            generation: u64::from(generation),
            reason: "fuzz".into(),
        }),
        Op::Presence { generation, count, ttl } => frame(
            generation,
            "presenceUpdate",
            json!({"participantCount": count, "ttlSeconds": ttl}),
        ),
        Op::Message { generation, sender, kind, content } => frame(
            generation,
            "newMessage",
            json!({"sender": sender, "kind": kind, "content": content}),
        ),
        Op::Error { generation, code } => {
            frame(generation, "error", json!({"code": code, "message": "fuzz"}))
        },
    }
}

fn to_key(key: Key) -> KeyInput {
    match key {
        Key::Char(c) => KeyInput::Char(c),
        Key::Enter { shift } => KeyInput::Enter { shift },
        Key::Backspace => KeyInput::Backspace,
        Key::Delete => KeyInput::Delete,
        Key::Left => KeyInput::Left,
        Key::Right => KeyInput::Right,
        Key::Home => KeyInput::Home,
        Key::End => KeyInput::End,
        Key::Tab => KeyInput::Tab,
        Key::Esc => KeyInput::Esc,
    }
}

fn frame(generation: u8, event: &str, data: serde_json::Value) -> AppEvent {
    AppEvent::Transport(ChannelEvent::FrameReceived {
        generation: u64::from(generation),
        frame: Frame { event: event.into(), data: Some(data) },
    })
}
