use crate::error::gateway::GatewayError;
use crate::session::{ConnectionStatus, SessionConfig};
use crate::tests::support::Harness;

use std::time::Duration;

use serde_json::{Value, json};
use tokio::time::Instant;

/// **VALUE**: Verifies requests fail fast before any transport is open.
///
/// **BUG THIS CATCHES**: Would catch requests being queued, or hanging, while
/// disconnected.
#[tokio::test(start_paused = true)]
async fn given_never_connected_session_when_request_then_not_connected() {
    // GIVEN: A fresh session
    let harness = Harness::new();

    // WHEN: Issuing a request
    let result = harness.session.request("status", json!({})).await;

    // THEN: It fails immediately
    assert!(matches!(result, Err(GatewayError::NotConnected { .. })));
}

/// **VALUE**: Verifies a request frame carries a fresh `req-N` id and resolves with
/// the response payload.
///
/// **BUG THIS CATCHES**: Would catch the whole response envelope being returned
/// instead of its payload.
#[tokio::test(start_paused = true)]
async fn given_connected_session_when_request_answered_then_payload_returned() {
    // GIVEN: A connected session
    let mut harness = Harness::new();
    let mut link = harness.connected().await;

    // WHEN: Issuing a request and answering it
    let request = harness.spawn_request("sessions.list", json!({ "limit": 5 }));
    let frame = link.recv_frame().await;
    link.respond_ok("req-1", json!({ "sessions": [] }));

    // THEN: The frame is well-formed and the payload comes back
    assert_eq!(
        frame,
        json!({ "type": "req", "id": "req-1", "method": "sessions.list", "params": { "limit": 5 } })
    );
    assert_eq!(request.await.unwrap().unwrap(), json!({ "sessions": [] }));
}

/// **VALUE**: Verifies concurrent requests are matched by id regardless of response
/// order.
///
/// **WHY THIS MATTERS**: The gateway answers slow methods later than fast ones.
///
/// **BUG THIS CATCHES**: Would catch FIFO matching of responses.
#[tokio::test(start_paused = true)]
async fn given_two_requests_when_answered_in_reverse_then_each_gets_own_payload() {
    // GIVEN: Two requests in flight
    let mut harness = Harness::new();
    let mut link = harness.connected().await;
    let first = harness.spawn_request("status", json!({}));
    let first_id = link.recv_frame().await["id"].clone();
    let second = harness.spawn_request("health", json!({}));
    let second_id = link.recv_frame().await["id"].clone();
    assert_ne!(first_id, second_id);

    // WHEN: The second is answered first
    link.respond_ok(second_id.as_str().unwrap(), json!({ "for": "health" }));
    link.respond_ok(first_id.as_str().unwrap(), json!({ "for": "status" }));

    // THEN: Each caller gets its own result
    assert_eq!(second.await.unwrap().unwrap(), json!({ "for": "health" }));
    assert_eq!(first.await.unwrap().unwrap(), json!({ "for": "status" }));
}

/// **VALUE**: Verifies `ok: false` reaches the caller as a remote error, verbatim.
///
/// **BUG THIS CATCHES**: Would catch the server message being swallowed.
#[tokio::test(start_paused = true)]
async fn given_request_when_gateway_refuses_then_remote_error() {
    // GIVEN: A request in flight
    let mut harness = Harness::new();
    let mut link = harness.connected().await;
    let request = harness.spawn_request("config.set", json!({}));
    link.recv_frame().await;

    // WHEN: The gateway refuses it
    link.respond_error("req-1", "conflict", "config changed since last load");

    // THEN: The caller sees the remote error
    match request.await.unwrap() {
        Err(GatewayError::Remote { kind, message, .. }) => {
            assert_eq!(kind, "conflict");
            assert_eq!(message, "config changed since last load");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

/// **VALUE**: Verifies an unanswered request times out after 30 s and a late answer
/// is ignored.
///
/// **WHY THIS MATTERS**: A lost response must not block the caller forever, and the
/// stale answer must not confuse the next request.
///
/// **BUG THIS CATCHES**: Would catch the deadline not being armed, firing early, or a
/// late response settling a later request.
#[tokio::test(start_paused = true)]
async fn given_unanswered_request_when_deadline_passes_then_timeout_and_late_reply_ignored() {
    // GIVEN: A request nobody answers
    let mut harness = Harness::new();
    let mut link = harness.connected().await;
    let started = Instant::now();
    let request = harness.spawn_request("status", json!({}));
    link.recv_frame().await;

    // WHEN: The deadline passes, then the answer arrives late
    let result = request.await.unwrap();
    link.respond_ok("req-1", json!({ "late": true }));
    let next = harness.spawn_request("health", json!({}));
    let frame = link.recv_frame().await;
    link.respond_ok("req-2", json!({ "fresh": true }));

    // THEN: Timeout after 30 s, and the next request is unaffected
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert!(matches!(
        result,
        Err(GatewayError::Timeout { timeout_ms: 30_000, .. })
    ));
    assert_eq!(frame["id"], "req-2");
    assert_eq!(next.await.unwrap().unwrap(), json!({ "fresh": true }));
    assert_eq!(harness.session.status(), ConnectionStatus::Connected);
}

/// **VALUE**: Verifies the configured request timeout is honoured.
///
/// **BUG THIS CATCHES**: Would catch the session ignoring `SessionConfig` and always
/// using the default.
#[tokio::test(start_paused = true)]
async fn given_short_timeout_config_when_request_unanswered_then_times_out_early() {
    // GIVEN: A session with a 1 s request timeout
    let config = SessionConfig {
        request_timeout: Duration::from_secs(1),
        ..SessionConfig::default()
    };
    let mut harness = Harness::with_config(config);
    let mut link = harness.connected().await;
    let started = Instant::now();

    // WHEN: A request goes unanswered
    let request = harness.spawn_request("status", json!({}));
    link.recv_frame().await;
    let result = request.await.unwrap();

    // THEN: It timed out after about a second
    assert!(matches!(
        result,
        Err(GatewayError::Timeout { timeout_ms: 1_000, .. })
    ));
    assert!(started.elapsed() < Duration::from_secs(2));
}

/// **VALUE**: Verifies pending requests fail with `Closed` when the socket drops.
///
/// **BUG THIS CATCHES**: Would catch callers waiting the full 30 s for a response on a
/// socket that is already gone.
#[tokio::test(start_paused = true)]
async fn given_pending_request_when_socket_closes_then_closed_error_immediately() {
    // GIVEN: A request in flight
    let mut harness = Harness::new();
    let mut link = harness.connected().await;
    let started = Instant::now();
    let request = harness.spawn_request("status", json!({}));
    link.recv_frame().await;

    // WHEN: The socket closes
    link.close();

    // THEN: The request fails at once with Closed
    let result = request.await.unwrap();
    assert!(matches!(result, Err(GatewayError::Closed { .. })));
    assert!(started.elapsed() < Duration::from_secs(1));
}

/// **VALUE**: Verifies requests are allowed between transport open and handshake
/// completion.
///
/// **BUG THIS CATCHES**: Would catch requests being gated on `connected` status
/// rather than on an open transport.
#[tokio::test(start_paused = true)]
async fn given_open_transport_before_handshake_when_request_then_sent() {
    // GIVEN: A connect whose handshake has not completed
    let mut harness = Harness::new();
    let _connect = harness.spawn_connect();
    let mut link = harness.next_link().await;
    link.challenge("n1");
    let handshake = link.recv_frame().await;
    assert_eq!(handshake["id"], "connect-1");

    // WHEN: Issuing a request
    let request = harness.spawn_request("health", Value::Null);
    let frame = link.recv_frame().await;
    link.respond_ok("req-1", json!({ "ok": true }));

    // THEN: It went out with empty params and resolved
    assert_eq!(frame["params"], json!({}));
    assert_eq!(request.await.unwrap().unwrap(), json!({ "ok": true }));
}
