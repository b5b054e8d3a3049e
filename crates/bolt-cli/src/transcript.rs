//! Line-oriented rendering.
//!
//! The transcript remembers what it has already printed and writes only the
//! difference on each render: new messages, presence changes, status changes
//! and composer mode switches. Messages are printed once, when appended;
//! confirming an optimistic message in place prints nothing. Messages by the
//! local participant carry a `(you)` tag.

use std::io::{self, Write};

use bolt_app::{App, ComposerMode, ConnectionState};
use bolt_core::{Environment, Message, MessageBody, format_remaining};

/// Printed-so-far state of the terminal transcript.
#[derive(Debug, Default)]
pub struct Transcript {
    printed: usize,
    connection: ConnectionState,
    participants: Option<u32>,
    status: Option<String>,
    mode: ComposerMode,
    menu_open: bool,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Composer mode as of the last render.
    pub fn mode(&self) -> ComposerMode {
        self.mode
    }

    /// Write everything that changed since the last render.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn render<E: Environment, W: Write>(
        &mut self,
        app: &App<E>,
        out: &mut W,
    ) -> io::Result<()> {
        let state = app.connection_state();
        if *state != self.connection {
            if *state == ConnectionState::Connected {
                writeln!(out, "* joined as {}", app.session().display_name())?;
            }
            self.connection = state.clone();
        }

        if let Some(status) = app.status_message() {
            if self.status.as_deref() != Some(status) {
                writeln!(out, "! {status}")?;
                self.status = Some(status.to_string());
            }
        } else {
            self.status = None;
        }

        if let Some(presence) = app.session().presence() {
            if self.participants != Some(presence.participant_count) {
                writeln!(
                    out,
                    "* {}/{} here, {} left",
                    presence.participant_count,
                    app.config().room_capacity,
                    format_remaining(presence.ttl_seconds_remaining),
                )?;
                self.participants = Some(presence.participant_count);
            }
        }

        let session = app.session();
        let messages = session.messages();
        for message in messages.get(self.printed..).unwrap_or_default() {
            write_message(out, message, session.is_self(message))?;
        }
        self.printed = messages.len();

        let composer = app.composer();
        if composer.mode() != self.mode {
            match composer.mode() {
                ComposerMode::Code => writeln!(out, "* code mode: a blank line sends, /cancel leaves")?,
                ComposerMode::PlainText => writeln!(out, "* text mode")?,
            }
            self.mode = composer.mode();
        }
        if composer.is_attach_menu_open() && !self.menu_open {
            writeln!(out, "* attach: /code or /image <path>")?;
        }
        self.menu_open = composer.is_attach_menu_open();

        Ok(())
    }
}

fn write_message<W: Write>(out: &mut W, message: &Message, mine: bool) -> io::Result<()> {
    let sender = if mine { format!("{} (you)", message.sender) } else { message.sender.clone() };
    match &message.body {
        MessageBody::Text(content) => writeln!(out, "{sender}: {content}"),
        MessageBody::Code(content) => {
            writeln!(out, "{sender}:")?;
            for line in content.lines() {
                writeln!(out, "    {line}")?;
            }
            Ok(())
        },
        MessageBody::Image { caption, image } => {
            let name = image.name.as_deref().unwrap_or(&image.url);
            if caption.is_empty() {
                writeln!(out, "{sender}: [image: {name}]")
            } else {
                writeln!(out, "{sender}: [image: {name}] {caption}")
            }
        },
    }
}
