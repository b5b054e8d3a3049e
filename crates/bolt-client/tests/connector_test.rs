//! Connector tests against a local tokio-tungstenite gateway.
//!
//! Each test binds a real WebSocket server on loopback, so the handshake,
//! bearer header and close handling run over actual TCP.

use std::time::Duration;

use bolt_client::{Connector, TcpDialer, TransportConfig};
use bolt_core::ChannelEvent;
use bolt_proto::{Frame, Payload};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::{net::TcpListener, sync::mpsc::UnboundedReceiver};
use tokio_tungstenite::tungstenite::{
    Message,
    handshake::server::{ErrorResponse, Request, Response},
    http::{StatusCode, header::AUTHORIZATION},
    protocol::{CloseFrame, frame::coding::CloseCode},
};

const TOKEN: &str = "abc";
const PRESENCE: &str = r#"{"event":"presenceUpdate","data":{"participantCount":1,"ttlSeconds":60}}"#;

#[derive(Clone, Copy)]
enum Behavior {
    /// Greet with garbage and presence, then echo every text message.
    Echo,
    /// Close with a reason after the first text message.
    CloseAfterFirst,
}

/// Start a gateway on loopback and return its URL.
async fn spawn_gateway(behavior: Behavior) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let check = |request: &Request, response: Response| {
                    let bearer = request.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
                    if bearer == Some("Bearer abc") {
                        Ok(response)
                    } else {
                        let mut rejection = ErrorResponse::new(Some("bad token".into()));
                        *rejection.status_mut() = StatusCode::UNAUTHORIZED;
                        Err(rejection)
                    }
                };
                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, check).await else {
                    return;
                };

                if matches!(behavior, Behavior::Echo) {
                    let _ = ws.send(Message::Text("not json".into())).await;
                    let _ = ws.send(Message::Text(PRESENCE.into())).await;
                }

                while let Some(Ok(message)) = ws.next().await {
                    let Message::Text(text) = message else { continue };
                    match behavior {
                        Behavior::Echo => {
                            let _ = ws.send(Message::Text(text)).await;
                        },
                        Behavior::CloseAfterFirst => {
                            let close = CloseFrame { code: CloseCode::Away, reason: "bye".into() };
                            let _ = ws.send(Message::Close(Some(close))).await;
                        },
                    }
                }
            });
        }
    });

    format!("ws://{addr}/ws")
}

fn connector(url: String) -> (Connector<TcpDialer>, UnboundedReceiver<ChannelEvent>) {
    let config = TransportConfig {
        gateway_url: url,
        connect_timeout: Duration::from_secs(5),
        ..TransportConfig::default()
    };
    Connector::new(TcpDialer, config)
}

async fn next(events: &mut UnboundedReceiver<ChannelEvent>) -> ChannelEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv()).await.unwrap().unwrap()
}

#[tokio::test]
async fn opens_receives_and_echoes() {
    let url = spawn_gateway(Behavior::Echo).await;
    let (mut connector, mut events) = connector(url);

    connector.open(1, TOKEN);
    assert_eq!(next(&mut events).await, ChannelEvent::Opened { generation: 1 });

    // The malformed greeting is dropped; presence comes through.
    let event = next(&mut events).await;
    assert!(matches!(
        event,
        ChannelEvent::FrameReceived { generation: 1, ref frame } if frame.event == "presenceUpdate"
    ));

    connector.send(Payload::Join.into_frame().unwrap());
    let event = next(&mut events).await;
    assert_eq!(event, ChannelEvent::FrameReceived {
        generation: 1,
        frame: Frame { event: "join".into(), data: None },
    });

    connector.close(1);
    let event = next(&mut events).await;
    assert_eq!(event, ChannelEvent::Closed { generation: 1, reason: "closed by client".into() });
    assert_eq!(connector.active_generation(), None);
}

#[tokio::test]
async fn frames_keep_their_payload() {
    let url = spawn_gateway(Behavior::Echo).await;
    let (mut connector, mut events) = connector(url);
    connector.open(4, TOKEN);
    next(&mut events).await;
    next(&mut events).await;

    let frame = Frame { event: "newMessage".into(), data: Some(json!({"content": "hi"})) };
    connector.send(frame.clone());
    assert_eq!(next(&mut events).await, ChannelEvent::FrameReceived { generation: 4, frame });
}

#[tokio::test]
async fn bad_token_closes_before_open() {
    let url = spawn_gateway(Behavior::Echo).await;
    let (mut connector, mut events) = connector(url);

    connector.open(2, "wrong");
    let event = next(&mut events).await;
    assert!(
        matches!(event, ChannelEvent::Closed { generation: 2, ref reason } if reason.contains("401")),
        "unexpected event {event:?}"
    );
}

#[tokio::test]
async fn gateway_close_reports_reason() {
    let url = spawn_gateway(Behavior::CloseAfterFirst).await;
    let (mut connector, mut events) = connector(url);

    connector.open(1, TOKEN);
    assert_eq!(next(&mut events).await, ChannelEvent::Opened { generation: 1 });
    connector.send(Payload::Join.into_frame().unwrap());

    assert_eq!(next(&mut events).await, ChannelEvent::Closed {
        generation: 1,
        reason: "closed by gateway: bye".into(),
    });
}

#[tokio::test]
async fn refused_connection_reports_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (mut connector, mut events) = connector(format!("ws://{addr}/ws"));
    connector.open(7, TOKEN);
    assert!(matches!(next(&mut events).await, ChannelEvent::Closed { generation: 7, .. }));
}

#[tokio::test]
async fn reopening_replaces_the_connection() {
    let url = spawn_gateway(Behavior::Echo).await;
    let (mut connector, mut events) = connector(url);

    connector.open(1, TOKEN);
    next(&mut events).await;
    connector.open(2, TOKEN);
    assert_eq!(connector.active_generation(), Some(2));

    // Anything generation 1 queued before the abort comes first.
    while next(&mut events).await != (ChannelEvent::Opened { generation: 2 }) {}

    connector.send(Payload::Join.into_frame().unwrap());
    for _ in 0..2 {
        let event = next(&mut events).await;
        assert_eq!(event.generation(), 2, "aborted connection reported {event:?}");
    }
}
