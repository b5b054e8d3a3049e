//! Client transport
//!
//! I/O half of the Bolt client: the WebSocket connection to the session
//! gateway and the production [`Environment`](bolt_core::Environment).
//!
//! # Components
//!
//! - [`Connector`]: opens one WebSocket per generation and reports
//!   [`ChannelEvent`](bolt_core::ChannelEvent)s back to the runtime
//! - [`Dialer`]: connect-and-handshake seam, so simulations can swap the network
//! - [`SystemEnv`]: wall clock and OS entropy

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod system_env;
pub mod transport;

pub use error::TransportError;
pub use system_env::SystemEnv;
pub use transport::{Connector, Dialer, TcpDialer, TransportConfig};
