//! Line driver for the command-line client.
//!
//! Implements the [`Driver`] trait with stdin lines for input, a plain
//! [`Write`] sink for output and the production WebSocket [`Connector`].

use std::{
    collections::VecDeque,
    io::{self, BufRead, Write},
    thread,
};

use bolt_app::{App, AppEvent, Driver};
use bolt_client::{Connector, TransportConfig, TransportError};
use bolt_core::{ChannelEvent, Environment, Generation};
use bolt_proto::Frame;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
    commands::{Command, HELP},
    transcript::Transcript,
};

/// Lines buffered between the stdin thread and the runtime.
pub const INPUT_BUFFER: usize = 16;

/// Command-line client errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// I/O error on the terminal.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Gateway address or token unusable.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Read stdin lines on a dedicated thread.
///
/// The channel closes at end of input. The thread is not joined: a blocked
/// read must not keep the process alive after the app quits.
pub fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(INPUT_BUFFER);
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                },
                Err(err) => {
                    tracing::warn!(%err, "stdin read failed");
                    break;
                },
            }
        }
    });
    rx
}

/// Driver reading commands from lines and printing a running transcript.
pub struct LineDriver<W: Write + Send> {
    connector: Connector,
    transport: mpsc::UnboundedReceiver<ChannelEvent>,
    lines: mpsc::Receiver<String>,
    pending: VecDeque<AppEvent>,
    transcript: Transcript,
    output: W,
}

impl<W: Write + Send> LineDriver<W> {
    /// Create a driver reading `lines` and writing to `output`.
    pub fn new(config: TransportConfig, lines: mpsc::Receiver<String>, output: W) -> Self {
        let (connector, transport) = Connector::new(bolt_client::TcpDialer, config);
        Self {
            connector,
            transport,
            lines,
            pending: VecDeque::new(),
            transcript: Transcript::new(),
            output,
        }
    }

    /// Output sink.
    pub fn output(&self) -> &W {
        &self.output
    }

    fn queue_line(&mut self, line: &str) -> io::Result<()> {
        match Command::parse(line) {
            Command::Help => writeln!(self.output, "{HELP}")?,
            Command::Invalid(hint) => writeln!(self.output, "! {hint}")?,
            command => self.pending.extend(command.into_events(self.transcript.mode())),
        }
        self.output.flush()
    }
}

impl<W: Write + Send> Driver for LineDriver<W> {
    type Error = CliError;

    async fn next_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            tokio::select! {
                biased;

                Some(event) = self.transport.recv() => return Ok(Some(AppEvent::Transport(event))),

                line = self.lines.recv() => match line {
                    Some(line) => self.queue_line(&line)?,
                    None => return Ok(None),
                },
            }
        }
    }

    fn open(&mut self, generation: Generation, token: &str) {
        self.connector.open(generation, token);
    }

    fn send_frame(&mut self, frame: Frame) {
        self.connector.send(frame);
    }

    fn close(&mut self, generation: Generation) {
        self.connector.close(generation);
    }

    fn render<E: Environment>(&mut self, app: &App<E>) -> Result<(), Self::Error> {
        self.transcript.render(app, &mut self.output)?;
        self.output.flush()?;
        Ok(())
    }

    fn stop(&mut self) {
        self.connector.stop();
    }
}

#[cfg(test)]
mod tests {
    use bolt_app::KeyInput;
    use bolt_core::SessionConfig;
    use bolt_harness::SimEnv;

    use super::*;

    fn driver() -> (LineDriver<Vec<u8>>, mpsc::Sender<String>) {
        let (tx, rx) = mpsc::channel(INPUT_BUFFER);
        (LineDriver::new(TransportConfig::default(), rx, Vec::new()), tx)
    }

    #[tokio::test]
    async fn text_line_becomes_insert_and_submit() {
        let (mut driver, tx) = driver();
        tx.send("hello".into()).await.unwrap();

        assert_eq!(driver.next_event().await.unwrap(), Some(AppEvent::InsertText("hello".into())));
        assert_eq!(driver.next_event().await.unwrap(), Some(AppEvent::Submit));
    }

    #[tokio::test]
    async fn end_of_input_ends_the_session() {
        let (mut driver, tx) = driver();
        drop(tx);
        assert_eq!(driver.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn help_is_printed_and_skipped() {
        let (mut driver, tx) = driver();
        tx.send("/help".into()).await.unwrap();
        tx.send("/bogus".into()).await.unwrap();
        tx.send("/quit".into()).await.unwrap();

        assert_eq!(driver.next_event().await.unwrap(), Some(AppEvent::Quit));
        let out = String::from_utf8(driver.output().clone()).unwrap();
        assert!(out.starts_with(HELP));
        assert!(out.contains("! unknown command /bogus"));
    }

    #[tokio::test]
    async fn rendered_mode_steers_line_translation() {
        let (mut driver, tx) = driver();
        let mut app = App::new(SimEnv::new(), SessionConfig::default(), "Ada", "abc");
        app.handle(AppEvent::InsertCode);
        driver.render(&app).unwrap();

        tx.send("x = 1".into()).await.unwrap();
        assert_eq!(driver.next_event().await.unwrap(), Some(AppEvent::InsertText("x = 1".into())));
        assert_eq!(
            driver.next_event().await.unwrap(),
            Some(AppEvent::Key(KeyInput::Enter { shift: true }))
        );
    }

    #[tokio::test]
    async fn transport_events_are_forwarded() {
        let (mut driver, _tx) = driver();
        driver.open(1, "abc\nbroken");

        assert_eq!(
            driver.next_event().await.unwrap(),
            Some(AppEvent::Transport(ChannelEvent::Closed {
                generation: 1,
                reason: TransportError::InvalidToken.to_string(),
            }))
        );
    }
}
