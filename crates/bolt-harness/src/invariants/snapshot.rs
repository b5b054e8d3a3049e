//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture what the user can see at a point in time. Invariants
//! operate on snapshots rather than live state so checks are consistent and
//! independent of the environment type.

use bolt_app::App;
use bolt_core::{ComposerMode, ConnectionState, Environment, Message, PresenceSnapshot};

/// Snapshot of the application as rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppView {
    /// Connection state
    pub connection: ConnectionState,
    /// Conversation log, oldest first
    pub messages: Vec<Message>,
    /// Latest presence, clamped. `None` before admission.
    pub presence: Option<PresenceSnapshot>,
    /// Configured room capacity
    pub capacity: u32,
    /// Composer mode
    pub composer_mode: ComposerMode,
    /// Draft text
    pub buffer: String,
    /// Cursor position in characters
    pub cursor: usize,
    /// Whether the attach menu is open
    pub attach_menu_open: bool,
    /// Whether the countdown ticker runs
    pub countdown_running: bool,
    /// Whether a reconnect is pending
    pub reconnect_scheduled: bool,
    /// Status line
    pub status: Option<String>,
}

impl AppView {
    /// Capture the observable state of `app`.
    pub fn capture<E: Environment>(app: &App<E>) -> Self {
        let session = app.session();
        let composer = app.composer();
        Self {
            connection: app.connection_state().clone(),
            messages: session.messages().to_vec(),
            presence: session.presence(),
            capacity: app.config().room_capacity,
            composer_mode: composer.mode(),
            buffer: composer.buffer().to_string(),
            cursor: composer.cursor(),
            attach_menu_open: composer.is_attach_menu_open(),
            countdown_running: app.countdown_running(),
            reconnect_scheduled: app.reconnect_scheduled(),
            status: app.status_message().map(str::to_string),
        }
    }

    /// Message bodies in order.
    pub fn contents(&self) -> Vec<&str> {
        self.messages.iter().map(|m| m.body.content()).collect()
    }

    /// Number of messages the gateway has not confirmed.
    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_pending()).count()
    }

    /// Remaining TTL. `None` before admission.
    pub fn ttl_seconds_remaining(&self) -> Option<u64> {
        self.presence.map(|p| p.ttl_seconds_remaining)
    }
}
