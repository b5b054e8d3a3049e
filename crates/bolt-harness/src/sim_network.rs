//! In-memory network between simulated clients and the model gateway.
//!
//! Each open connection is a route from a gateway [`ConnId`] to the event
//! queue of the driver that opened it, tagged with the driver's generation.
//! Gateway outputs are delivered synchronously, so a scenario is fully
//! determined by the order of calls.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bolt_core::{ChannelEvent, Generation};
use bolt_proto::Frame;
use tokio::sync::mpsc;

use crate::sim_gateway::{ConnId, GatewayOutput, SimGateway};

/// Close reason reported for refused connections.
pub const REFUSED: &str = "connection refused";

struct Route {
    generation: Generation,
    events: mpsc::UnboundedSender<ChannelEvent>,
}

struct NetworkState {
    gateway: SimGateway,
    routes: HashMap<ConnId, Route>,
    partitioned: bool,
}

/// Shared handle to the simulated network. Clones share state.
#[derive(Clone)]
pub struct SimNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl SimNetwork {
    /// Create a network in front of `gateway`.
    pub fn new(gateway: SimGateway) -> Self {
        let state = NetworkState { gateway, routes: HashMap::new(), partitioned: false };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    /// Open a connection for `generation`. Reports `Opened` or `Closed` on
    /// `events` and returns the gateway's id for the connection.
    pub fn connect(
        &self,
        token: &str,
        generation: Generation,
        events: mpsc::UnboundedSender<ChannelEvent>,
    ) -> Option<ConnId> {
        let mut state = self.lock();
        if state.partitioned {
            let _ = events.send(ChannelEvent::Closed { generation, reason: REFUSED.into() });
            return None;
        }

        match state.gateway.accept(token) {
            Ok(conn) => {
                let _ = events.send(ChannelEvent::Opened { generation });
                state.routes.insert(conn, Route { generation, events });
                Some(conn)
            },
            Err(error) => {
                let reason = format!("handshake rejected: {}", error.message);
                let _ = events.send(ChannelEvent::Closed { generation, reason });
                None
            },
        }
    }

    /// Deliver a client frame to the gateway.
    pub fn send(&self, conn: ConnId, frame: &Frame) {
        let mut state = self.lock();
        if !state.routes.contains_key(&conn) {
            tracing::debug!(conn, "frame on closed connection dropped");
            return;
        }
        let outputs = state.gateway.handle_frame(conn, frame);
        state.dispatch(outputs);
    }

    /// Client-initiated close.
    pub fn close(&self, conn: ConnId) {
        let mut state = self.lock();
        if state.routes.remove(&conn).is_some() {
            let outputs = state.gateway.disconnect(conn);
            state.dispatch(outputs);
        }
    }

    /// Drop every connection as if the network failed.
    pub fn drop_connections(&self, reason: &str) {
        let mut state = self.lock();
        let outputs = state.gateway.drop_all(reason);
        state.dispatch(outputs);
    }

    /// Refuse (or accept again) new connections.
    pub fn set_partitioned(&self, partitioned: bool) {
        self.lock().partitioned = partitioned;
    }

    /// Run `f` against the gateway and deliver whatever it outputs.
    pub fn with_gateway<F>(&self, f: F)
    where
        F: FnOnce(&mut SimGateway) -> Vec<GatewayOutput>,
    {
        let mut state = self.lock();
        let outputs = f(&mut state.gateway);
        state.dispatch(outputs);
    }

    /// Inspect the gateway.
    pub fn inspect<R>(&self, f: impl FnOnce(&SimGateway) -> R) -> R {
        f(&self.lock().gateway)
    }

    /// Number of open connections.
    pub fn open_connections(&self) -> usize {
        self.lock().routes.len()
    }

    fn lock(&self) -> MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NetworkState {
    fn dispatch(&mut self, outputs: Vec<GatewayOutput>) {
        for output in outputs {
            match output {
                GatewayOutput::Send { to, frame } => {
                    if let Some(route) = self.routes.get(&to) {
                        let _ = route.events.send(ChannelEvent::FrameReceived {
                            generation: route.generation,
                            frame,
                        });
                    }
                },
                GatewayOutput::Close { conn, reason } => {
                    if let Some(route) = self.routes.remove(&conn) {
                        let _ = route
                            .events
                            .send(ChannelEvent::Closed { generation: route.generation, reason });
                    }
                },
            }
        }
    }
}
