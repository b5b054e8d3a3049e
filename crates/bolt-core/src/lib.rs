//! Session core
//!
//! Sans-IO state machines for a short-lived, token-gated chat room: the
//! transport channel, the conversation state, and the message composer.
//!
//! # Architecture
//!
//! Every component is a pure state machine. Methods take the current time
//! (and any randomness) as parameters and return actions for a driver to
//! execute, so the same code runs under the production runtime and under
//! deterministic simulation.
//!
//! # Components
//!
//! - [`Channel`]: one logical gateway connection, tagged by generation
//! - [`Session`]: append-only message log, presence and countdown
//! - [`Composer`]: plain-text / code drafting and image attachment
//! - [`Backoff`]: bounded exponential reconnect schedule
//! - [`Environment`]: wall clock and randomness abstraction

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backoff;
pub mod channel;
pub mod composer;
pub mod config;
pub mod env;
pub mod error;
pub mod message;
pub mod presence;
pub mod session;

pub use backoff::Backoff;
pub use channel::{Channel, ChannelAction, ChannelEvent, ConnectionState, Generation, Inbound};
pub use composer::{Composer, ComposerMode, KeyInput};
pub use config::{ReconnectConfig, SessionConfig, WireFormat};
pub use env::Environment;
pub use error::ChannelError;
pub use message::{CorrelationId, Message, MessageBody, Origin};
pub use presence::{PresenceSnapshot, ROOM_CAPACITY, format_remaining};
pub use session::{InboundOutcome, Session};
