//! Application state machine.
//!
//! This module defines the [`App`] state machine, which combines the transport
//! channel, the session state and the composer into one view, completely
//! decoupled from I/O.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Routes user input through the composer and sends finished messages
//!   optimistically.
//! - Feeds gateway events into the session and starts the countdown on the
//!   first presence snapshot.
//! - Schedules bounded reconnects after an admitted connection drops and
//!   resubmits unconfirmed messages once the gateway is back.
//!
//! # Resubmission
//!
//! A message composed while no socket was open never reached the transport
//! and is sent on the next open. A message that did go out is resent after a
//! reconnect only when the wire is typed and the gateway echoes correlation
//! ids, so the echo can be matched and nothing is shown twice.

use bolt_core::{
    Backoff, Channel, ChannelAction, ChannelError, ChannelEvent, Composer, ConnectionState,
    CorrelationId, Environment, Inbound, MessageBody, Session, SessionConfig, WireFormat,
};
use bolt_proto::SendMessage;

use crate::{AppAction, AppEvent};

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies, fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App<E: Environment> {
    /// Wall clock and randomness.
    env: E,
    /// Session configuration.
    config: SessionConfig,
    /// Opaque session token.
    token: String,
    /// Gateway connection.
    channel: Channel,
    /// Messages and presence.
    session: Session,
    /// Draft input.
    composer: Composer,
    /// Reconnect schedule.
    backoff: Backoff,
    /// Whether the runtime's countdown ticker is running.
    countdown_running: bool,
    /// Whether a reconnect deadline is pending.
    reconnect_scheduled: bool,
    /// Whether the current connection is a reconnect not yet admitted.
    reconnecting: bool,
    /// Transient status message. `None` if no message.
    status_message: Option<String>,
}

impl<E: Environment> App<E> {
    /// Create an app for `display_name` joining with `token`.
    pub fn new(
        env: E,
        config: SessionConfig,
        display_name: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let session = Session::with_capacity(display_name, config.room_capacity);
        let backoff = Backoff::new(config.reconnect.clone());
        Self {
            env,
            config,
            token: token.into(),
            channel: Channel::new(),
            session,
            composer: Composer::new(),
            backoff,
            countdown_running: false,
            reconnect_scheduled: false,
            reconnecting: false,
            status_message: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Key(key) => match self.composer.handle_key(key) {
                Some(body) => self.send_body(body),
                None => vec![AppAction::Render],
            },
            AppEvent::InsertText(text) => {
                self.composer.insert_str(&text);
                vec![AppAction::Render]
            },
            AppEvent::Submit => match self.composer.submit() {
                Some(body) => self.send_body(body),
                None => vec![],
            },
            AppEvent::ToggleAttachMenu => {
                self.composer.toggle_attach_menu();
                vec![AppAction::Render]
            },
            AppEvent::InsertCode => {
                self.composer.select_insert_code();
                vec![AppAction::Render]
            },
            AppEvent::CancelCode => {
                self.composer.cancel_code();
                vec![AppAction::Render]
            },
            AppEvent::ClearDraft => {
                self.composer.clear_draft();
                vec![AppAction::Render]
            },
            AppEvent::PickImage(image) => {
                let body = self.composer.pick_image(image);
                self.send_body(body)
            },
            AppEvent::Tick => {
                if !self.countdown_running {
                    return vec![];
                }
                self.session.tick();
                if self.session.is_expired() {
                    self.status_message = Some("Session expired".into());
                    self.countdown_running = false;
                    return vec![AppAction::StopCountdown, AppAction::Render];
                }
                vec![AppAction::Render]
            },
            AppEvent::ReconnectDue => {
                if !self.reconnect_scheduled {
                    return vec![];
                }
                self.reconnect_scheduled = false;
                self.status_message = Some(format!(
                    "Reconnecting (attempt {})...",
                    self.backoff.attempts()
                ));
                let actions = self.channel.reconnect();
                let mut actions = self.apply_channel(actions);
                actions.push(AppAction::Render);
                actions
            },
            AppEvent::Transport(event) => self.handle_transport(event),
            AppEvent::Quit => {
                let mut actions = self.disconnect();
                actions.push(AppAction::Quit);
                actions
            },
        }
    }

    /// Open the gateway connection.
    pub fn connect(&mut self) -> Vec<AppAction> {
        let actions = self.channel.connect(self.token.clone());
        if !actions.is_empty() {
            self.status_message = Some("Connecting...".into());
        }
        let mut actions = self.apply_channel(actions);
        actions.push(AppAction::Render);
        actions
    }

    /// Tear down the connection and release timers. Safe to call repeatedly.
    pub fn disconnect(&mut self) -> Vec<AppAction> {
        let mut actions = Vec::new();
        if self.countdown_running {
            self.countdown_running = false;
            actions.push(AppAction::StopCountdown);
        }
        if self.reconnect_scheduled {
            self.reconnect_scheduled = false;
            actions.push(AppAction::CancelReconnect);
        }
        self.reconnecting = false;

        let closes = self.channel.disconnect();
        actions.extend(self.apply_channel(closes));
        actions
    }

    /// Current connection state.
    pub fn connection_state(&self) -> &ConnectionState {
        self.channel.state()
    }

    /// Conversation state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Draft input state.
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether the countdown ticker should be running.
    pub fn countdown_running(&self) -> bool {
        self.countdown_running
    }

    /// Whether a reconnect is scheduled.
    pub fn reconnect_scheduled(&self) -> bool {
        self.reconnect_scheduled
    }

    /// Transient status message. `None` if no message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    fn send_body(&mut self, body: MessageBody) -> Vec<AppAction> {
        let id = CorrelationId::generate(&self.env);
        let now = self.env.wall_clock_ms();
        let send = self.session.append_optimistic(body, now, id.clone()).to_send();

        let mut actions = self.transmit(&id, send);
        actions.push(AppAction::Render);
        actions
    }

    /// Hand an optimistic message to the channel, recording whether it left.
    fn transmit(&mut self, id: &CorrelationId, send: SendMessage) -> Vec<AppAction> {
        let actions = self.channel.send(self.config.wire_format.encode(send));
        if actions.iter().any(|a| matches!(a, ChannelAction::Send(_))) {
            self.session.mark_sent(id);
        }
        self.apply_channel(actions)
    }

    fn handle_transport(&mut self, event: ChannelEvent) -> Vec<AppAction> {
        let opened = matches!(event, ChannelEvent::Opened { .. });
        let current = event.generation() == self.channel.generation();
        let actions = self.channel.handle(event);
        let mut actions = self.apply_channel(actions);

        if opened && self.channel.is_connected() {
            self.status_message = None;
            actions.extend(self.resubmit_pending());
        }

        if current {
            actions.push(AppAction::Render);
        }
        actions
    }

    fn resubmit_pending(&mut self) -> Vec<AppAction> {
        let matchable = self.reconnecting
            && self.config.wire_format == WireFormat::Typed
            && self.session.echoes_correlation();

        let mut resend = Vec::new();
        let mut withheld = 0;
        for message in self.session.pending() {
            match &message.correlation_id {
                Some(id) if matchable || self.session.is_unsent(message) => {
                    resend.push((id.clone(), message.to_send()));
                },
                _ => withheld += 1,
            }
        }

        if withheld > 0 {
            tracing::info!(
                count = withheld,
                "not resubmitting sent messages, gateway does not acknowledge correlation ids"
            );
        }
        if resend.is_empty() {
            return vec![];
        }

        tracing::info!(count = resend.len(), "resubmitting unconfirmed messages");
        let mut actions = Vec::new();
        for (id, send) in resend {
            actions.extend(self.transmit(&id, send));
        }
        actions
    }

    fn apply_channel(&mut self, actions: Vec<ChannelAction>) -> Vec<AppAction> {
        let mut out = Vec::with_capacity(actions.len());
        for action in actions {
            match action {
                ChannelAction::Open { generation, token } => {
                    out.push(AppAction::Open { generation, token });
                },
                ChannelAction::Send(frame) => out.push(AppAction::Send(frame)),
                ChannelAction::Close { generation } => out.push(AppAction::Close { generation }),
                ChannelAction::Deliver(inbound) => out.extend(self.deliver(inbound)),
                ChannelAction::Lost(error) => out.extend(self.connection_lost(error)),
            }
        }
        out
    }

    fn deliver(&mut self, inbound: Inbound) -> Vec<AppAction> {
        match inbound {
            Inbound::Message(message) => {
                self.admitted();
                self.session.apply_inbound(message, self.env.wall_clock_ms());
                vec![]
            },
            Inbound::Presence(update) => {
                self.admitted();
                self.session.apply_presence(update);
                if self.countdown_running || self.session.is_expired() {
                    return vec![];
                }
                self.countdown_running = true;
                vec![AppAction::StartCountdown]
            },
            Inbound::Error(error) => {
                self.status_message = Some(ChannelError::from(error).to_string());
                let mut actions = Vec::new();
                if self.countdown_running {
                    self.countdown_running = false;
                    actions.push(AppAction::StopCountdown);
                }
                self.reconnecting = false;
                actions
            },
        }
    }

    fn admitted(&mut self) {
        if self.reconnecting {
            tracing::info!(attempts = self.backoff.attempts(), "reconnected");
            self.reconnecting = false;
        }
        self.backoff.reset();
    }

    fn connection_lost(&mut self, error: ChannelError) -> Vec<AppAction> {
        let mut actions = Vec::new();
        if self.countdown_running {
            self.countdown_running = false;
            actions.push(AppAction::StopCountdown);
        }

        let retryable = error.is_transient()
            || (self.reconnecting && matches!(error, ChannelError::JoinFailed { .. }));

        if !retryable {
            self.reconnecting = false;
            self.status_message = Some(format!("Could not join: {error}"));
            return actions;
        }

        if self.session.is_expired() {
            self.reconnecting = false;
            self.status_message = Some("Session expired".into());
            return actions;
        }

        match self.backoff.next_delay() {
            Some(delay) => {
                tracing::info!(?delay, attempt = self.backoff.attempts(), %error, "scheduling reconnect");
                self.reconnecting = true;
                self.reconnect_scheduled = true;
                self.status_message = Some(format!("Connection lost, retrying in {delay:?}"));
                actions.push(AppAction::ScheduleReconnect { delay });
            },
            None => {
                self.reconnecting = false;
                let failure = if self.config.reconnect.enabled {
                    ChannelError::RetriesExhausted { attempts: self.backoff.attempts() }
                } else {
                    error
                };
                self.status_message = Some(failure.to_string());
                self.channel.fail(failure);
            },
        }
        actions
    }
}
