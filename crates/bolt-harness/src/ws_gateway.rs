//! WebSocket gateway for turmoil simulations.
//!
//! `WsGateway` serves the [`SimGateway`] model over turmoil TCP with
//! tokio-tungstenite, including bearer-token checks during the HTTP upgrade.
//! [`TurmoilDialer`] lets [`bolt_client::Connector`] reach it.

use std::{
    collections::HashMap,
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bolt_client::{Dialer, TransportError};
use bolt_proto::Frame;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    WebSocketStream,
    tungstenite::{
        Message,
        handshake::{
            client,
            server::{ErrorResponse, Request, Response},
        },
        http::{StatusCode, header::AUTHORIZATION},
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
use turmoil::net::{TcpListener, TcpStream};

use crate::sim_gateway::{ConnId, GatewayOutput, SimGateway};

enum Outgoing {
    Frame(Frame),
    Close(String),
}

struct Hub {
    gateway: SimGateway,
    outboxes: HashMap<ConnId, mpsc::UnboundedSender<Outgoing>>,
}

impl Hub {
    fn dispatch(&mut self, outputs: Vec<GatewayOutput>) {
        for output in outputs {
            match output {
                GatewayOutput::Send { to, frame } => {
                    if let Some(outbox) = self.outboxes.get(&to) {
                        let _ = outbox.send(Outgoing::Frame(frame));
                    }
                },
                GatewayOutput::Close { conn, reason } => {
                    if let Some(outbox) = self.outboxes.remove(&conn) {
                        let _ = outbox.send(Outgoing::Close(reason));
                    }
                },
            }
        }
    }
}

/// Gateway model served over simulated WebSockets. Clones share state.
#[derive(Clone)]
pub struct WsGateway {
    hub: Arc<Mutex<Hub>>,
}

impl WsGateway {
    /// Serve `gateway`.
    pub fn new(gateway: SimGateway) -> Self {
        Self { hub: Arc::new(Mutex::new(Hub { gateway, outboxes: HashMap::new() })) }
    }

    /// Bind `address` and accept connections forever.
    pub async fn serve(self, address: &str) -> io::Result<()> {
        let listener = TcpListener::bind(address).await?;
        loop {
            let (stream, peer) = listener.accept().await?;
            let gateway = self.clone();
            tokio::spawn(async move {
                if let Err(err) = gateway.handle_connection(stream).await {
                    tracing::warn!(%peer, %err, "gateway connection failed");
                }
            });
        }
    }

    /// Run `f` against the model and deliver whatever it outputs.
    pub fn with_gateway<F>(&self, f: F)
    where
        F: FnOnce(&mut SimGateway) -> Vec<GatewayOutput>,
    {
        let mut hub = self.lock();
        let outputs = f(&mut hub.gateway);
        hub.dispatch(outputs);
    }

    /// Inspect the model.
    pub fn inspect<R>(&self, f: impl FnOnce(&SimGateway) -> R) -> R {
        f(&self.lock().gateway)
    }

    async fn handle_connection(self, stream: TcpStream) -> Result<(), TransportError> {
        let mut token = None;
        let ws = tokio_tungstenite::accept_hdr_async(stream, |request: &Request, response: Response| {
            let bearer = request
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "));
            match bearer {
                Some(t) if self.lock().gateway.authorize(t) => {
                    token = Some(t.to_string());
                    Ok(response)
                },
                _ => Err(unauthorized()),
            }
        })
        .await?;

        let Some(token) = token else {
            return Err(TransportError::InvalidToken);
        };
        let (conn, outbox) = {
            let mut hub = self.lock();
            let conn = hub.gateway.accept(&token).map_err(|_| TransportError::InvalidToken)?;
            let (tx, rx) = mpsc::unbounded_channel();
            hub.outboxes.insert(conn, tx);
            (conn, rx)
        };

        let result = self.pump(conn, ws, outbox).await;

        let mut hub = self.lock();
        hub.outboxes.remove(&conn);
        let outputs = hub.gateway.disconnect(conn);
        hub.dispatch(outputs);
        result
    }

    async fn pump(
        &self,
        conn: ConnId,
        ws: WebSocketStream<TcpStream>,
        mut outbox: mpsc::UnboundedReceiver<Outgoing>,
    ) -> Result<(), TransportError> {
        let (mut write, mut read) = ws.split();
        loop {
            tokio::select! {
                outgoing = outbox.recv() => match outgoing {
                    Some(Outgoing::Frame(frame)) => {
                        let text = frame.encode().map_err(|e| TransportError::WebSocket(e.to_string()))?;
                        write.send(Message::Text(text.into())).await?;
                    },
                    Some(Outgoing::Close(reason)) => {
                        let close = CloseFrame { code: CloseCode::Normal, reason: reason.into() };
                        write.send(Message::Close(Some(close))).await?;
                        return Ok(());
                    },
                    None => return Ok(()),
                },
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Text(text))) => match Frame::decode(&text) {
                        Ok(frame) => {
                            let mut hub = self.lock();
                            let outputs = hub.gateway.handle_frame(conn, &frame);
                            hub.dispatch(outputs);
                        },
                        Err(err) => tracing::warn!(conn, %err, "gateway dropping malformed frame"),
                    },
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {},
                    Some(Err(err)) => return Err(err.into()),
                },
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Hub> {
        self.hub.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn unauthorized() -> ErrorResponse {
    let mut response = ErrorResponse::new(Some("invalid session token".into()));
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response
}

/// Dials over turmoil's simulated TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurmoilDialer;

impl Dialer for TurmoilDialer {
    type Stream = TcpStream;

    async fn handshake(
        &self,
        request: client::Request,
    ) -> Result<WebSocketStream<Self::Stream>, TransportError> {
        let uri = request.uri();
        let host = uri.host().ok_or_else(|| TransportError::InvalidUrl(uri.to_string()))?;
        let address = format!("{host}:{}", uri.port_u16().unwrap_or(80));

        let stream = TcpStream::connect(address.as_str()).await?;
        let (ws, _response) = tokio_tungstenite::client_async(request, stream).await?;
        Ok(ws)
    }
}
