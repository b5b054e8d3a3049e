//! Application layer for Bolt
//!
//! Pure state machine and generic runtime that wire the session core to a
//! platform front end, so deterministic simulations exercise the same code
//! that runs in production.
//!
//! # Components
//!
//! - [`App`]: view state machine combining channel, session and composer
//! - [`Driver`]: trait for platform-specific I/O
//! - [`Runtime`]: generic event loop owning the countdown and reconnect timers

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod driver;
mod event;
mod runtime;

pub use action::AppAction;
pub use app::App;
pub use bolt_core::{ComposerMode, ConnectionState, KeyInput};
pub use driver::Driver;
pub use event::AppEvent;
pub use runtime::Runtime;
