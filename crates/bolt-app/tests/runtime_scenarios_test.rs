//! End-to-end scenarios through the real Runtime.
//!
//! Each test runs [`Runtime`] with a [`SimDriver`] against the model gateway
//! under paused tokio time, so countdown and reconnect timing are exact.
//!
//! # Oracle Pattern
//!
//! Tests end with oracle checks that verify:
//! - the rendered view matches the expected conversation and presence
//! - the gateway saw exactly the expected frames
//! - no invariant was violated on any render

use std::time::Duration;

use bolt_app::{AppEvent, ConnectionState, KeyInput, Runtime};
use bolt_core::{
    ChannelError, ComposerMode, MessageBody, Origin, ReconnectConfig, SessionConfig, WireFormat,
};
use bolt_harness::{
    GatewayConfig, InvariantRegistry, SimDriver, SimDriverError, SimEnv, SimGateway, SimHandle,
    SimNetwork,
};
use bolt_proto::{ErrorPayload, Frame, ImageRef, Payload, PresenceUpdate};
use serde_json::json;
use tokio::{sync::mpsc, task::JoinHandle};

type RunTask = JoinHandle<Result<(), SimDriverError>>;

/// Start Ada's client against `gateway` and let it join.
async fn start(gateway: SimGateway, config: SessionConfig) -> (SimNetwork, SimHandle, RunTask) {
    let network = SimNetwork::new(gateway);
    let (driver, handle) =
        SimDriver::with_invariants(network.clone(), InvariantRegistry::standard());
    let runtime = Runtime::new(driver, SimEnv::with_seed(7), config, "Ada", "abc");
    let task = tokio::spawn(runtime.run());
    handle.settle().await;
    (network, handle, task)
}

fn gateway() -> SimGateway {
    SimGateway::default().with_participant("abc", "Ada").with_participant("bob", "Bob")
}

/// Quit, wait for the runtime, and check invariants held throughout.
async fn finish(handle: SimHandle, task: RunTask) {
    handle.quit();
    task.await.unwrap().unwrap();
    assert_eq!(handle.violations(), vec![]);
}

fn presence_frame(count: i64, ttl: i64) -> Frame {
    Payload::PresenceUpdate(PresenceUpdate::new(count, ttl))
        .into_frame()
        .unwrap()
}

/// Payloads of every `sendMessage` frame the gateway received.
fn sent_messages(network: &SimNetwork) -> Vec<Payload> {
    network.inspect(|gw| {
        gw.received()
            .iter()
            .filter(|(_, frame)| frame.event == "sendMessage")
            .map(|(_, frame)| Payload::from_frame(frame).unwrap())
            .collect()
    })
}

#[tokio::test(start_paused = true)]
async fn joins_and_starts_countdown() {
    let (network, handle, task) = start(gateway(), SessionConfig::default()).await;

    let view = handle.view().unwrap();
    assert_eq!(view.connection, ConnectionState::Connected);
    assert_eq!(view.presence.unwrap().participant_count, 1);
    assert!(view.countdown_running);
    assert_eq!(network.inspect(SimGateway::participant_count), 1);

    let joins = network.inspect(|gw| gw.received().iter().filter(|(_, f)| f.event == "join").count());
    assert_eq!(joins, 1);

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn hello_is_shown_twice_without_correlation_echo() {
    let config = GatewayConfig { echo_correlation: false, ..GatewayConfig::default() };
    let gateway = SimGateway::new(config).with_participant("abc", "Ada");
    let (_network, handle, task) = start(gateway, SessionConfig::default()).await;

    handle.say("hello");
    handle.settle().await;

    let view = handle.view().unwrap();
    assert_eq!(view.contents(), vec!["hello", "hello"]);
    assert_eq!(view.messages[0].origin, Origin::LocalOptimistic);
    assert_eq!(view.messages[1].origin, Origin::Confirmed);
    assert_eq!(view.messages[1].sender, "Ada");
    assert_eq!(view.buffer, "");

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn correlation_echo_confirms_in_place() {
    let (network, handle, task) = start(gateway(), SessionConfig::default()).await;

    handle.say("hello");
    handle.settle().await;

    let view = handle.view().unwrap();
    assert_eq!(view.contents(), vec!["hello"]);
    assert_eq!(view.messages[0].origin, Origin::Confirmed);
    assert_eq!(network.inspect(|gw| gw.history().len()), 1);

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn three_ticks_after_presence() {
    let (network, handle, task) = start(gateway(), SessionConfig::default()).await;

    network.with_gateway(|gw| gw.broadcast_frame(&presence_frame(3, 120)));
    tokio::time::sleep(Duration::from_secs(3)).await;

    let view = handle.view().unwrap();
    assert_eq!(view.presence.unwrap().participant_count, 3);
    assert_eq!(view.ttl_seconds_remaining(), Some(117));

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn legacy_code_is_fenced_on_the_wire() {
    let config = SessionConfig { wire_format: WireFormat::Legacy, ..SessionConfig::default() };
    let (network, handle, task) = start(gateway(), config).await;

    handle.send(AppEvent::ToggleAttachMenu);
    handle.send(AppEvent::InsertCode);
    handle.type_text("print(1)");
    handle.key(KeyInput::Enter { shift: false });
    handle.settle().await;

    let sent: Vec<_> = network.inspect(|gw| {
        gw.received()
            .iter()
            .filter(|(_, f)| f.event == "sendMessage")
            .map(|(_, f)| f.data.clone())
            .collect()
    });
    assert_eq!(sent, vec![Some(json!("```print(1)```"))]);

    let view = handle.view().unwrap();
    assert_eq!(view.composer_mode, ComposerMode::PlainText);
    assert_eq!(view.messages[0].body, MessageBody::Code("print(1)".into()));

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn image_pick_sends_one_message() {
    let (network, handle, task) = start(gateway(), SessionConfig::default()).await;

    handle.send(AppEvent::ToggleAttachMenu);
    handle.send(AppEvent::PickImage(ImageRef::new("blob:cat", "cat.png")));
    handle.settle().await;

    let view = handle.view().unwrap();
    assert_eq!(view.messages.len(), 1);
    assert_eq!(view.messages[0].body.image().and_then(|i| i.name.as_deref()), Some("cat.png"));
    assert_eq!(view.composer_mode, ComposerMode::PlainText);
    assert!(!view.attach_menu_open);
    assert_eq!(sent_messages(&network).len(), 1);

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn blank_submit_sends_nothing() {
    let (network, handle, task) = start(gateway(), SessionConfig::default()).await;

    handle.say("   ");
    handle.send(AppEvent::InsertCode);
    handle.send(AppEvent::Submit);
    handle.settle().await;

    let view = handle.view().unwrap();
    assert!(view.messages.is_empty());
    assert!(sent_messages(&network).is_empty());

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn messages_from_others_are_appended() {
    let (network, handle, task) = start(gateway(), SessionConfig::default()).await;

    network.with_gateway(|gw| gw.announce("Bob", "hi Ada"));
    handle.settle().await;

    let view = handle.view().unwrap();
    assert_eq!(view.contents(), vec!["hi Ada"]);
    assert_eq!(view.messages[0].sender, "Bob");

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn reconnect_resubmits_pending_messages() {
    let (network, handle, task) = start(gateway(), SessionConfig::default()).await;

    // An echoed message shows the gateway acknowledges correlation ids.
    handle.say("one");
    handle.settle().await;

    network.drop_connections("connection reset");
    handle.settle().await;
    let view = handle.view().unwrap();
    assert_eq!(view.connection, ConnectionState::Disconnected);
    assert!(view.reconnect_scheduled);
    assert!(!view.countdown_running);

    handle.say("two");
    handle.settle().await;
    assert_eq!(handle.view().unwrap().pending_count(), 1);

    tokio::time::sleep(Duration::from_millis(600)).await;

    let view = handle.view().unwrap();
    assert_eq!(view.connection, ConnectionState::Connected);
    assert_eq!(view.contents(), vec!["one", "two"]);
    assert_eq!(view.pending_count(), 0);
    assert!(view.countdown_running);
    assert_eq!(network.inspect(|gw| gw.history().len()), 2);

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn no_resubmission_without_correlation_echo() {
    let config = GatewayConfig { echo_correlation: false, ..GatewayConfig::default() };
    let gateway = SimGateway::new(config).with_participant("abc", "Ada");
    let (network, handle, task) = start(gateway, SessionConfig::default()).await;

    handle.say("one");
    handle.settle().await;
    network.drop_connections("connection reset");
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(handle.view().unwrap().connection, ConnectionState::Connected);
    assert_eq!(sent_messages(&network).len(), 1);

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn message_typed_while_offline_is_sent_after_reconnect() {
    let config = GatewayConfig { echo_correlation: false, ..GatewayConfig::default() };
    let gateway = SimGateway::new(config).with_participant("abc", "Ada");
    let (network, handle, task) = start(gateway, SessionConfig::default()).await;

    network.drop_connections("connection reset");
    handle.settle().await;
    handle.say("typed while offline");
    handle.settle().await;
    assert!(sent_messages(&network).is_empty());

    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(handle.view().unwrap().connection, ConnectionState::Connected);
    let sent = sent_messages(&network);
    assert!(matches!(
        sent.as_slice(),
        [Payload::SendMessage(send)] if send.content == "typed while offline"
    ));

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn reconnect_gives_up_after_max_attempts() {
    let reconnect = ReconnectConfig {
        base_delay: Duration::from_millis(100),
        max_attempts: 2,
        ..ReconnectConfig::default()
    };
    let config = SessionConfig { reconnect, ..SessionConfig::default() };
    let (network, handle, task) = start(gateway(), config).await;

    network.set_partitioned(true);
    network.drop_connections("connection reset");
    tokio::time::sleep(Duration::from_secs(1)).await;

    let view = handle.view().unwrap();
    assert_eq!(
        view.connection,
        ConnectionState::Errored(ChannelError::RetriesExhausted { attempts: 2 })
    );
    assert!(!view.reconnect_scheduled);

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn reconnect_disabled_fails_immediately() {
    let config = SessionConfig { reconnect: ReconnectConfig::disabled(), ..SessionConfig::default() };
    let (network, handle, task) = start(gateway(), config).await;

    network.drop_connections("connection reset");
    handle.settle().await;

    let view = handle.view().unwrap();
    assert!(matches!(
        view.connection,
        ConnectionState::Errored(ChannelError::ConnectionLost { .. })
    ));
    assert!(!view.reconnect_scheduled);

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn room_full_is_terminal() {
    let config = GatewayConfig { capacity: 1, ..GatewayConfig::default() };
    let gateway = SimGateway::new(config).with_participant("abc", "Ada").with_participant("bob", "Bob");
    let network = SimNetwork::new(gateway);

    // Bob takes the only seat.
    let (bob_tx, _bob_rx) = mpsc::unbounded_channel();
    let bob = network.connect("bob", 1, bob_tx).unwrap();
    network.send(bob, &Payload::Join.into_frame().unwrap());

    let (driver, handle) =
        SimDriver::with_invariants(network.clone(), InvariantRegistry::standard());
    let runtime = Runtime::new(driver, SimEnv::new(), SessionConfig::default(), "Ada", "abc");
    let task = tokio::spawn(runtime.run());
    tokio::time::sleep(Duration::from_secs(5)).await;

    let view = handle.view().unwrap();
    assert_eq!(view.connection, ConnectionState::Errored(ErrorPayload::room_full().into()));
    assert!(!view.reconnect_scheduled);
    assert!(view.status.unwrap().contains("ROOM_FULL"));
    assert_eq!(network.inspect(SimGateway::participant_count), 1);

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn rejected_token_is_not_retried() {
    let network = SimNetwork::new(gateway());
    let (driver, handle) = SimDriver::new(network.clone());
    let runtime = Runtime::new(driver, SimEnv::new(), SessionConfig::default(), "Ada", "stolen");
    let task = tokio::spawn(runtime.run());
    tokio::time::sleep(Duration::from_secs(5)).await;

    let view = handle.view().unwrap();
    assert!(matches!(view.connection, ConnectionState::Errored(ChannelError::JoinFailed { .. })));
    assert!(!view.reconnect_scheduled);
    assert!(view.presence.is_none());

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn countdown_stops_at_expiry_and_blocks_reconnect() {
    let (network, handle, task) = start(gateway(), SessionConfig::default()).await;

    network.with_gateway(|gw| gw.broadcast_frame(&presence_frame(1, 2)));
    tokio::time::sleep(Duration::from_secs(5)).await;

    let view = handle.view().unwrap();
    assert_eq!(view.ttl_seconds_remaining(), Some(0));
    assert!(!view.countdown_running);
    assert_eq!(view.status.as_deref(), Some("Session expired"));

    network.drop_connections("room closed");
    handle.settle().await;
    let view = handle.view().unwrap();
    assert!(!view.reconnect_scheduled);
    assert_eq!(view.connection, ConnectionState::Disconnected);

    finish(handle, task).await;
}

#[tokio::test(start_paused = true)]
async fn quit_leaves_the_room() {
    let (network, handle, task) = start(gateway(), SessionConfig::default()).await;
    assert_eq!(network.open_connections(), 1);

    finish(handle, task).await;

    assert_eq!(network.open_connections(), 0);
    assert_eq!(network.inspect(SimGateway::participant_count), 0);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_quits() {
    let (network, handle, task) = start(gateway(), SessionConfig::default()).await;
    drop(handle);

    task.await.unwrap().unwrap();
    assert_eq!(network.open_connections(), 0);
}
