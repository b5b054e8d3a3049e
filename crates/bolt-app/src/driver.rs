//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each front end implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::future::Future;

use bolt_core::{Environment, Generation};
use bolt_proto::Frame;

use crate::{App, AppEvent};

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in the command-line client and in
/// simulation.
///
/// Connection methods are fire-and-forget: their outcome comes back through
/// [`next_event`](Driver::next_event) as
/// [`AppEvent::Transport`](crate::AppEvent::Transport) tagged with the
/// generation passed to [`open`](Driver::open).
///
/// # Implementations
///
/// - **CLI**: stdin lines for input, tokio-tungstenite for the WebSocket
/// - **Simulation**: in-memory channels and a model gateway
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Wait for the next user or transport event.
    ///
    /// Returns `None` when input is exhausted and the app should quit. Must be
    /// cancel safe: the runtime races it against its timers.
    fn next_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Start opening a connection authenticated with `token`.
    fn open(&mut self, generation: Generation, token: &str);

    /// Send a frame on the open connection. Dropped if none is open.
    fn send_frame(&mut self, frame: Frame);

    /// Close the connection opened under `generation`, if still open.
    fn close(&mut self, generation: Generation);

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render<E: Environment>(&mut self, app: &App<E>) -> Result<(), Self::Error>;

    /// Stop all connections and clean up resources.
    fn stop(&mut self);
}
