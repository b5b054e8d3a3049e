//! Command-line client for Bolt
//!
//! A thin shell over [`bolt_app::Driver`] that reads commands from stdin and
//! prints one line per message. All orchestration logic lives in the generic
//! [`bolt_app::Runtime`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod commands;
pub mod line;
pub mod transcript;

pub use bolt_app::{App, AppAction, AppEvent, Driver, Runtime};
pub use commands::Command;
pub use line::{CliError, LineDriver, stdin_lines};
pub use transcript::Transcript;
