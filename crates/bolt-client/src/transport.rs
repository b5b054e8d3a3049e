//! WebSocket transport.
//!
//! Provides [`Connector`], which opens one WebSocket per connection generation
//! and bridges it to channels. This is a thin layer that only moves JSON
//! envelopes: protocol logic remains in the sans-IO
//! [`Channel`](bolt_core::Channel).
//!
//! # Events
//!
//! Every connection task reports exactly one
//! [`ChannelEvent::Closed`] when it ends, preceded by
//! [`ChannelEvent::Opened`] if the handshake succeeded. All events carry the
//! generation passed to [`Connector::open`].

use std::{future::Future, time::Duration};

use bolt_core::{ChannelEvent, Generation};
use bolt_proto::Frame;
use futures::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::mpsc,
    task::AbortHandle,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream,
    tungstenite::{
        Message,
        client::IntoClientRequest,
        handshake::client::Request,
        http::{HeaderValue, header::AUTHORIZATION},
    },
};

use crate::TransportError;

/// Default gateway endpoint.
pub const DEFAULT_GATEWAY_URL: &str = "ws://127.0.0.1:8080/ws";

/// Time allowed for TCP connect plus WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Frames queued for the socket before sends are dropped.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Gateway WebSocket URL (`ws://` or, with the `tls` feature, `wss://`)
    pub gateway_url: String,
    /// Timeout for connect plus handshake
    pub connect_timeout: Duration,
    /// Outbound queue depth
    pub outbound_buffer: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

/// Establishes the WebSocket for a prepared handshake request.
///
/// The seam between the connector and the network, so simulations can run
/// the real transport over a simulated TCP stack.
pub trait Dialer: Clone + Send + Sync + 'static {
    /// Underlying byte stream.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connect and perform the WebSocket handshake.
    fn handshake(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<WebSocketStream<Self::Stream>, TransportError>> + Send;
}

/// Dials the real network with tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    type Stream = MaybeTlsStream<TcpStream>;

    async fn handshake(
        &self,
        request: Request,
    ) -> Result<WebSocketStream<Self::Stream>, TransportError> {
        let (ws, _response) = tokio_tungstenite::connect_async(request).await?;
        Ok(ws)
    }
}

/// Build the handshake request carrying `Authorization: Bearer <token>`.
///
/// # Errors
///
/// - `TransportError::InvalidUrl` if the URL is not a WebSocket URL
/// - `TransportError::InvalidToken` if the token is not a valid header value
pub fn handshake_request(gateway_url: &str, token: &str) -> Result<Request, TransportError> {
    let mut request = gateway_url
        .into_client_request()
        .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
    let bearer =
        HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| TransportError::InvalidToken)?;
    request.headers_mut().insert(AUTHORIZATION, bearer);
    Ok(request)
}

struct ActiveConnection {
    generation: Generation,
    outbound: mpsc::Sender<Frame>,
    task: AbortHandle,
}

/// Opens gateway connections and reports their events.
///
/// Holds at most one connection. Opening a new generation aborts the
/// previous one.
pub struct Connector<D: Dialer = TcpDialer> {
    dialer: D,
    config: TransportConfig,
    events: mpsc::UnboundedSender<ChannelEvent>,
    active: Option<ActiveConnection>,
}

impl<D: Dialer> Connector<D> {
    /// Create a connector and the receiver for its events.
    pub fn new(dialer: D, config: TransportConfig) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { dialer, config, events, active: None }, rx)
    }

    /// Generation of the connection currently held, if any.
    pub fn active_generation(&self) -> Option<Generation> {
        self.active.as_ref().map(|a| a.generation)
    }

    /// Start connecting. Must be called within a tokio runtime.
    pub fn open(&mut self, generation: Generation, token: &str) {
        self.stop();

        let request = match handshake_request(&self.config.gateway_url, token) {
            Ok(request) => request,
            Err(err) => {
                tracing::error!(generation, %err, "cannot build handshake");
                let _ = self.events.send(ChannelEvent::Closed { generation, reason: err.to_string() });
                return;
            },
        };

        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.outbound_buffer);
        let dialer = self.dialer.clone();
        let timeout = self.config.connect_timeout;
        let events = self.events.clone();

        let task = tokio::spawn(async move {
            let reason = match tokio::time::timeout(timeout, dialer.handshake(request)).await {
                Ok(Ok(ws)) => run_session(ws, generation, outbound_rx, &events).await,
                Ok(Err(err)) => {
                    tracing::warn!(generation, %err, "connect failed");
                    err.to_string()
                },
                Err(_) => {
                    tracing::warn!(generation, ?timeout, "connect timed out");
                    TransportError::Timeout(timeout).to_string()
                },
            };
            let _ = events.send(ChannelEvent::Closed { generation, reason });
        });

        self.active =
            Some(ActiveConnection { generation, outbound: outbound_tx, task: task.abort_handle() });
    }

    /// Queue a frame on the active connection. Dropped if none is active or
    /// the queue is full.
    pub fn send(&mut self, frame: Frame) {
        let Some(active) = self.active.as_ref() else {
            tracing::debug!(event = %frame.event, "no connection, dropping frame");
            return;
        };
        if let Err(err) = active.outbound.try_send(frame) {
            tracing::warn!(generation = active.generation, %err, "outbound queue rejected frame");
        }
    }

    /// Close the connection of `generation` gracefully, if it is the active
    /// one. The task sends a close frame and exits.
    pub fn close(&mut self, generation: Generation) {
        if self.active_generation() == Some(generation) {
            tracing::info!(generation, "closing websocket");
            self.active = None;
        }
    }

    /// Abort the active connection immediately.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.abort();
        }
    }
}

impl<D: Dialer> Drop for Connector<D> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pump frames between an open WebSocket and the runtime.
///
/// Emits [`ChannelEvent::Opened`] first, then one
/// [`ChannelEvent::FrameReceived`] per decodable text message. Returns the
/// close reason once the socket ends or `outbound` is dropped.
pub async fn run_session<S>(
    ws: WebSocketStream<S>,
    generation: Generation,
    mut outbound: mpsc::Receiver<Frame>,
    events: &mpsc::UnboundedSender<ChannelEvent>,
) -> String
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (mut write, mut read) = ws.split();
    if events.send(ChannelEvent::Opened { generation }).is_err() {
        return "runtime stopped".into();
    }
    tracing::info!(generation, "websocket open");

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    let _ = write.close().await;
                    return "closed by client".into();
                };
                match frame.encode() {
                    Ok(text) => {
                        if let Err(err) = write.send(Message::Text(text.into())).await {
                            return err.to_string();
                        }
                    },
                    Err(err) => tracing::error!(%err, "dropping unencodable frame"),
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => match Frame::decode(&text) {
                    Ok(frame) => {
                        if events.send(ChannelEvent::FrameReceived { generation, frame }).is_err() {
                            return "runtime stopped".into();
                        }
                    },
                    Err(err) => tracing::warn!(%err, "dropping malformed frame"),
                },
                Some(Ok(Message::Close(close))) => {
                    return match close {
                        Some(close) => format!("closed by gateway: {}", &*close.reason),
                        None => "closed by gateway".into(),
                    };
                },
                Some(Ok(_)) => {},
                Some(Err(err)) => return err.to_string(),
                None => return "connection ended".into(),
            },
        }
    }
}
