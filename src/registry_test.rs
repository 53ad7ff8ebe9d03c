use super::*;
use crate::session::SessionPhase;
use crate::transport::TransportKind;
use std::time::Duration;

fn test_config() -> SessionConfig {
    SessionConfig {
        disconnect_delay: Duration::from_secs(5),
        heartbeat_interval: Duration::from_secs(25),
        response_limit: 128_000,
    }
}

fn xhr() -> Transport {
    Transport::new(TransportKind::XhrPolling, None).unwrap()
}

fn echo_registry() -> Registry {
    Registry::new(
        test_config(),
        Hooks::new().on_message(|session, message| session.send([message])),
    )
}

#[tokio::test]
async fn create_is_idempotent() {
    let registry = echo_registry();
    let a = registry.create("abc");
    let b = registry.create("abc");
    assert_eq!(registry.len(), 1);

    a.send(["shared"]);
    assert_eq!(b.queued(), vec!["shared"]);
}

#[tokio::test]
async fn unknown_key_is_absent() {
    let registry = echo_registry();
    assert!(registry.get("nope").is_none());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn open_request_creates_and_opens() {
    let registry = echo_registry();
    let mut attachment = registry.handle_open_request("s1", xhr());
    assert_eq!(attachment.try_next_chunk().as_deref(), Some("o\n"));
    assert_eq!(registry.get("s1").map(|s| s.phase()), Some(SessionPhase::Detached));
}

#[tokio::test]
async fn poll_request_requires_existing_session() {
    let registry = echo_registry();
    let result = registry.handle_poll_request("missing", xhr());
    assert!(matches!(result, Err(SockJsError::NotOpen)));
}

#[tokio::test]
async fn send_request_errors() {
    let registry = echo_registry();
    assert_eq!(registry.handle_send_request("missing", r#"["x"]"#), Err(SockJsError::NotOpen));

    drop(registry.handle_open_request("s1", xhr()));
    assert_eq!(registry.handle_send_request("s1", ""), Err(SockJsError::PayloadExpected));
    assert_eq!(registry.handle_send_request("s1", "[\"x\""), Err(SockJsError::InvalidJson));
    assert_eq!(registry.handle_send_request("s1", "[1]"), Err(SockJsError::InvalidJson));
}

#[tokio::test]
async fn send_request_reaches_hook() {
    let registry = echo_registry();
    drop(registry.handle_open_request("s1", xhr()));

    registry.handle_send_request("s1", r#"["x","y"]"#).unwrap();
    let mut poll = registry.handle_poll_request("s1", xhr()).unwrap();
    assert_eq!(poll.try_next_chunk().as_deref(), Some("a[\"x\",\"y\"]\n"));
}

#[tokio::test]
async fn send_to_closed_session_is_not_open() {
    let registry = echo_registry();
    registry.create("s1").close();
    assert_eq!(registry.handle_send_request("s1", r#"["x"]"#), Err(SockJsError::NotOpen));
}

#[tokio::test]
async fn notify_peer_closed_detaches_polling_consumer() {
    let registry = echo_registry();
    drop(registry.handle_open_request("s1", xhr()));
    let _poll = registry.handle_poll_request("s1", xhr()).unwrap();
    assert_eq!(registry.get("s1").map(|s| s.phase()), Some(SessionPhase::Attached));

    registry.notify_peer_closed("s1");
    assert_eq!(registry.get("s1").map(|s| s.phase()), Some(SessionPhase::Detached));
    registry.notify_peer_closed("unknown");
}

#[tokio::test(start_paused = true)]
async fn closed_session_is_evicted_after_grace() {
    let registry = echo_registry();
    drop(registry.handle_open_request("s1", xhr()));

    // Disconnect delay closes it, the same delay again makes it evictable.
    tokio::time::sleep(Duration::from_millis(5_100)).await;
    let closed = registry.get("s1").expect("still held during grace");
    assert_eq!(closed.phase(), SessionPhase::Closed);
    drop(closed);

    tokio::time::sleep(Duration::from_millis(5_100)).await;
    assert!(registry.get("s1").is_none());
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn evicted_key_can_be_reused() {
    let registry = echo_registry();
    registry.create("s1").close();
    tokio::time::sleep(Duration::from_millis(5_100)).await;

    let mut attachment = registry.handle_open_request("s1", xhr());
    assert_eq!(attachment.try_next_chunk().as_deref(), Some("o\n"));
}
