//! Driver over the real WebSocket transport.
//!
//! `NetDriver` wires a [`Connector`] to scripted input, so end-to-end tests
//! exercise the production transport, typically over turmoil's simulated TCP
//! via [`crate::TurmoilDialer`].

use bolt_app::{App, AppEvent, Driver};
use bolt_client::{Connector, Dialer, TransportConfig};
use bolt_core::{ChannelEvent, Environment, Generation};
use bolt_proto::Frame;
use tokio::sync::mpsc;

use crate::{
    invariants::InvariantRegistry,
    sim_driver::{SimDriverError, SimHandle, ViewRecorder},
};

/// Driver using [`Connector`] for transport and a [`SimHandle`] for input.
pub struct NetDriver<D: Dialer> {
    connector: Connector<D>,
    transport: mpsc::UnboundedReceiver<ChannelEvent>,
    input: mpsc::UnboundedReceiver<AppEvent>,
    recorder: ViewRecorder,
}

impl<D: Dialer> NetDriver<D> {
    /// Create a driver dialing through `dialer` and the handle that scripts
    /// it. Every render is checked against `registry`.
    pub fn new(dialer: D, config: TransportConfig, registry: InvariantRegistry) -> (Self, SimHandle) {
        let recorder = ViewRecorder::default().with_invariants(registry);
        let (handle, input) = SimHandle::new(recorder.clone());
        let (connector, transport) = Connector::new(dialer, config);
        (Self { connector, transport, input, recorder }, handle)
    }
}

impl<D: Dialer> Driver for NetDriver<D> {
    type Error = SimDriverError;

    async fn next_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        tokio::select! {
            biased;
            event = self.transport.recv() => match event {
                Some(event) => Ok(Some(AppEvent::Transport(event))),
                None => Err(SimDriverError("transport channel closed".into())),
            },
            event = self.input.recv() => Ok(event),
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
        self.recorder.record(app);
        Ok(())
    }

    fn stop(&mut self) {
        self.connector.stop();
    }
}
