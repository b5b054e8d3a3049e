//! Application input events.
//!
//! This module defines [`AppEvent`], the inputs that drive the
//! [`crate::App`] state machine.
//!
//! Events originate from three sources:
//! - User interactions (keys, menu selections, image picks).
//! - Runtime timers (countdown ticks, reconnect deadlines).
//! - Transport notifications tagged with their connection generation.

use bolt_core::{ChannelEvent, KeyInput};
use bolt_proto::ImageRef;

/// Events processed by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Text pasted or typed as a whole line.
    InsertText(String),

    /// Send button.
    Submit,

    /// Attach button.
    ToggleAttachMenu,

    /// "Insert code" menu selection.
    InsertCode,

    /// Leave code mode.
    CancelCode,

    /// Discard the draft.
    ClearDraft,

    /// Image chosen from the attach menu.
    PickImage(ImageRef),

    /// One second of countdown elapsed.
    Tick,

    /// Scheduled reconnect deadline reached.
    ReconnectDue,

    /// Transport notification.
    Transport(ChannelEvent),

    /// User asked to leave.
    Quit,
}

impl From<ChannelEvent> for AppEvent {
    fn from(event: ChannelEvent) -> Self {
        Self::Transport(event)
    }
}

impl From<KeyInput> for AppEvent {
    fn from(key: KeyInput) -> Self {
        Self::Key(key)
    }
}
