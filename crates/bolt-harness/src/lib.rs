//! Deterministic simulation harness for the Bolt chat client.
//!
//! Simulated implementations of the Environment and Driver traits, a model
//! session gateway, and a turmoil WebSocket gateway for deterministic,
//! reproducible testing of the full client under varying network conditions.
//!
//! # Drivers
//!
//! - [`SimDriver`] connects the runtime to the model gateway through an
//!   in-memory [`SimNetwork`]. Combine it with paused tokio time to test
//!   countdown and reconnect timing exactly.
//! - [`NetDriver`] uses the production [`bolt_client::Connector`]. With
//!   [`TurmoilDialer`] and [`WsGateway`] the real WebSocket code runs over
//!   simulated TCP.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Drivers check an [`InvariantRegistry`] on every render. Use
//! [`InvariantRegistry::standard()`] for the common set.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod net_driver;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_gateway;
pub mod sim_network;
pub mod ws_gateway;

pub use invariants::{AppView, Invariant, InvariantRegistry, InvariantResult, Violation};
pub use net_driver::NetDriver;
pub use sim_driver::{SimDriver, SimDriverError, SimHandle};
pub use sim_env::SimEnv;
pub use sim_gateway::{ConnId, GatewayConfig, GatewayOutput, SimGateway};
pub use sim_network::SimNetwork;
pub use ws_gateway::{TurmoilDialer, WsGateway};
