//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the command-line driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`bolt_app::Runtime`] orchestration code runs in both production and
//! simulation. User input is scripted through a [`SimHandle`]; connections go
//! through a [`SimNetwork`].

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use bolt_app::{App, AppEvent, Driver};
use bolt_core::{ChannelEvent, Environment, Generation, KeyInput};
use bolt_proto::Frame;
use tokio::sync::mpsc;

use crate::{
    invariants::{AppView, InvariantRegistry, Violation},
    sim_gateway::ConnId,
    sim_network::SimNetwork,
};

/// Polling interval of [`SimHandle::wait_until`].
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Error type for simulation drivers.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

#[derive(Default)]
struct Recorded {
    latest: Option<AppView>,
    renders: usize,
    violations: Vec<Violation>,
}

/// Captures a view on every render and checks invariants against it.
#[derive(Clone, Default)]
pub(crate) struct ViewRecorder {
    state: Arc<Mutex<Recorded>>,
    invariants: Option<Arc<InvariantRegistry>>,
}

impl ViewRecorder {
    pub(crate) fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(Arc::new(registry));
        self
    }

    pub(crate) fn record<E: Environment>(&self, app: &App<E>) {
        let view = AppView::capture(app);
        let mut state = self.lock();
        if let Some(registry) = &self.invariants {
            if let Err(violations) = registry.check_all(&view) {
                for violation in &violations {
                    tracing::error!(%violation, render = state.renders, "invariant violated");
                }
                state.violations.extend(violations);
            }
        }
        state.renders += 1;
        state.latest = Some(view);
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Test-side handle for scripting input and observing renders.
#[derive(Clone)]
pub struct SimHandle {
    input: mpsc::UnboundedSender<AppEvent>,
    recorder: ViewRecorder,
}

impl SimHandle {
    pub(crate) fn new(recorder: ViewRecorder) -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (input, rx) = mpsc::unbounded_channel();
        (Self { input, recorder }, rx)
    }

    /// Inject a user event.
    pub fn send(&self, event: AppEvent) {
        let _ = self.input.send(event);
    }

    /// Press a key.
    pub fn key(&self, key: KeyInput) {
        self.send(AppEvent::Key(key));
    }

    /// Type `text` one key at a time.
    pub fn type_text(&self, text: &str) {
        for c in text.chars() {
            self.key(KeyInput::Char(c));
        }
    }

    /// Type `text` and press Enter.
    pub fn say(&self, text: &str) {
        self.type_text(text);
        self.key(KeyInput::Enter { shift: false });
    }

    /// Ask the app to quit.
    pub fn quit(&self) {
        self.send(AppEvent::Quit);
    }

    /// Latest rendered view. `None` before the first render.
    pub fn view(&self) -> Option<AppView> {
        self.recorder.lock().latest.clone()
    }

    /// Number of renders so far.
    pub fn render_count(&self) -> usize {
        self.recorder.lock().renders
    }

    /// Invariant violations recorded so far.
    pub fn violations(&self) -> Vec<Violation> {
        self.recorder.lock().violations.clone()
    }

    /// Let the runtime drain everything that is ready.
    ///
    /// Sleeps for a millisecond. Under paused tokio time this only returns
    /// once every other task is idle.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    /// Poll the latest view until `predicate` holds or `within` elapses.
    /// Returns whether the predicate held.
    pub async fn wait_until(&self, within: Duration, predicate: impl Fn(&AppView) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            if self.view().is_some_and(|view| predicate(&view)) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Simulation driver for deterministic testing.
///
/// Implements [`Driver`] so the same [`bolt_app::Runtime`] orchestration code
/// runs in both the command-line client and simulation tests. Input ends,
/// and the app quits, once every [`SimHandle`] is dropped.
pub struct SimDriver {
    network: SimNetwork,
    input: mpsc::UnboundedReceiver<AppEvent>,
    transport_tx: mpsc::UnboundedSender<ChannelEvent>,
    transport_rx: mpsc::UnboundedReceiver<ChannelEvent>,
    connection: Option<(Generation, ConnId)>,
    recorder: ViewRecorder,
}

impl SimDriver {
    /// Create a driver on `network` and the handle that scripts it.
    pub fn new(network: SimNetwork) -> (Self, SimHandle) {
        Self::build(network, ViewRecorder::default())
    }

    /// Create a driver that checks `registry` on every render.
    pub fn with_invariants(network: SimNetwork, registry: InvariantRegistry) -> (Self, SimHandle) {
        Self::build(network, ViewRecorder::default().with_invariants(registry))
    }

    fn build(network: SimNetwork, recorder: ViewRecorder) -> (Self, SimHandle) {
        let (handle, input) = SimHandle::new(recorder.clone());
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let driver =
            Self { network, input, transport_tx, transport_rx, connection: None, recorder };
        (driver, handle)
    }

    /// Generation and gateway id of the open connection, if any.
    pub fn connection(&self) -> Option<(Generation, ConnId)> {
        self.connection
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn next_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        tokio::select! {
            biased;
            Some(event) = self.transport_rx.recv() => Ok(Some(AppEvent::Transport(event))),
            event = self.input.recv() => Ok(event),
        }
    }

    fn open(&mut self, generation: Generation, token: &str) {
        if let Some((_, conn)) = self.connection.take() {
            self.network.close(conn);
        }
        self.connection = self
            .network
            .connect(token, generation, self.transport_tx.clone())
            .map(|conn| (generation, conn));
    }

    fn send_frame(&mut self, frame: Frame) {
        match self.connection {
            Some((_, conn)) => self.network.send(conn, &frame),
            None => tracing::debug!(event = %frame.event, "no connection, dropping frame"),
        }
    }

    fn close(&mut self, generation: Generation) {
        if let Some((current, conn)) = self.connection {
            if current == generation {
                self.connection = None;
                self.network.close(conn);
            }
        }
    }

    fn render<E: Environment>(&mut self, app: &App<E>) -> Result<(), Self::Error> {
        self.recorder.record(app);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some((_, conn)) = self.connection.take() {
            self.network.close(conn);
        }
    }
}
