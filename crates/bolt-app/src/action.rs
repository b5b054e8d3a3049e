//! Application side-effects.
//!
//! This module defines the [`AppAction`] enum, the instructions produced by
//! the [`crate::App`] state machine for the runtime to execute.

use std::time::Duration;

use bolt_core::Generation;
use bolt_proto::Frame;

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Open a gateway connection.
    Open {
        /// Generation to tag the connection's events with.
        generation: Generation,
        /// Opaque session token.
        token: String,
    },

    /// Send a frame on the open connection.
    Send(Frame),

    /// Close the connection opened under `generation`.
    Close {
        /// Generation of the connection to close.
        generation: Generation,
    },

    /// Start the one-second countdown ticker.
    StartCountdown,

    /// Stop the countdown ticker.
    StopCountdown,

    /// Deliver [`crate::AppEvent::ReconnectDue`] after `delay`.
    ScheduleReconnect {
        /// Backoff delay.
        delay: Duration,
    },

    /// Drop a scheduled reconnect.
    CancelReconnect,
}
