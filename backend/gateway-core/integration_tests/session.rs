use crate::helpers::{GOOD_TOKEN, start_gateway, unused_port};

use gateway_core::{ConnectionStatus, GatewayError, GatewaySession, SessionConfig};

use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn fast_config() -> SessionConfig {
    SessionConfig {
        handshake_fallback: Duration::from_millis(200),
        request_timeout: Duration::from_secs(2),
        reconnect_delay: Duration::from_millis(200),
        ..SessionConfig::default()
    }
}

async fn wait_until(condition: impl Fn() -> bool) {
    timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// **VALUE**: Full round trip over a real socket: challenge, handshake, request,
/// response, event, disconnect.
///
/// **WHY THIS MATTERS**: Unit tests drive the session through in-memory channels.
/// This proves the WebSocket connector frames text correctly in both directions.
///
/// **BUG THIS CATCHES**: Would catch binary frames being sent, the reader task not
/// delivering messages, or the nonce not reaching the wire.
#[tokio::test]
async fn given_real_gateway_when_connect_request_and_event_then_round_trip_works() {
    // GIVEN: A running gateway and a session with an event handler
    let gateway = start_gateway().await;
    let session = GatewaySession::new(fast_config());
    let (tx, mut events) = mpsc::unbounded_channel();
    session.on("tick", move |event: &gateway_core::GatewayEvent| {
        let _ = tx.send((event.seq, event.payload.clone()));
    });

    // WHEN: Connecting and issuing requests
    timeout(WAIT, session.connect(&gateway.url(), GOOD_TOKEN))
        .await
        .expect("connect timed out")
        .expect("connect should succeed");
    let echoed = session
        .request("echo", json!({ "hello": "gateway" }))
        .await
        .unwrap();
    session.request("emit", json!({})).await.unwrap();
    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    let unknown = session.request("nope", json!({})).await;

    // THEN: Everything made the round trip
    assert_eq!(session.status(), ConnectionStatus::Connected);
    assert_eq!(echoed, json!({ "hello": "gateway" }));
    assert_eq!(event, (Some(1), Some(json!({ "n": 1 }))));
    assert!(matches!(unknown, Err(GatewayError::Remote { ref kind, .. }) if kind == "unknown_method"));

    session.disconnect().await;
    assert_eq!(session.status(), ConnectionStatus::Disconnected);
}

/// **VALUE**: Verifies `http://` addresses are accepted and upgraded to WebSockets.
///
/// **BUG THIS CATCHES**: Would catch the connector being handed an `http://` URL.
#[tokio::test]
async fn given_http_url_when_connecting_then_normalized_and_connected() {
    // GIVEN: A running gateway addressed with http://
    let gateway = start_gateway().await;
    let session = GatewaySession::new(fast_config());
    let url = format!("http://127.0.0.1:{}/", gateway.port);

    // WHEN: Connecting
    let result = timeout(WAIT, session.connect(&url, GOOD_TOKEN)).await.unwrap();

    // THEN: Connected
    assert!(result.is_ok(), "connect failed: {result:?}");
    assert!(session.is_connected());
    session.disconnect().await;
}

/// **VALUE**: Verifies a wrong token is reported as a handshake rejection.
///
/// **BUG THIS CATCHES**: Would catch the server's message being lost, or the session
/// retrying with the bad token.
#[tokio::test]
async fn given_wrong_token_when_connecting_then_handshake_rejected() {
    // GIVEN: A running gateway
    let gateway = start_gateway().await;
    let session = GatewaySession::new(fast_config());

    // WHEN: Connecting with the wrong token
    let result = timeout(WAIT, session.connect(&gateway.url(), "wrong"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    // THEN: Rejected, error status, a single connection
    match result {
        Err(GatewayError::HandshakeRejected { message, .. }) => assert_eq!(message, "invalid token"),
        other => panic!("expected handshake rejection, got {other:?}"),
    }
    assert_eq!(session.status(), ConnectionStatus::Error);
    assert_eq!(gateway.connections(), 1);
}

/// **VALUE**: Verifies a first connect to a closed port fails without retries.
///
/// **BUG THIS CATCHES**: Would catch connection-refused hanging the connect call.
#[tokio::test]
async fn given_closed_port_when_connecting_then_transport_error() {
    // GIVEN: A port with no listener
    let port = unused_port().await;
    let session = GatewaySession::new(fast_config());

    // WHEN: Connecting
    let result = timeout(WAIT, session.connect(&format!("127.0.0.1:{port}"), GOOD_TOKEN))
        .await
        .unwrap();

    // THEN: Transport error and error status
    assert!(matches!(result, Err(GatewayError::Transport { .. })));
    assert_eq!(session.status(), ConnectionStatus::Error);
}

/// **VALUE**: Verifies the session recovers by itself after the gateway drops the
/// socket, and requests work again afterwards.
///
/// **WHY THIS MATTERS**: This is the gateway-restart scenario end to end.
///
/// **BUG THIS CATCHES**: Would catch the WebSocket close not being reported as
/// `Closed`, so no reconnect is ever scheduled.
#[tokio::test]
async fn given_connected_session_when_gateway_drops_socket_then_reconnects() {
    // GIVEN: A connected session
    let gateway = start_gateway().await;
    let session = GatewaySession::new(fast_config());
    timeout(WAIT, session.connect(&gateway.url(), GOOD_TOKEN))
        .await
        .unwrap()
        .unwrap();

    // WHEN: The gateway closes the socket mid-request
    let dropped = session.request("drop", json!({})).await;
    wait_until(|| gateway.connections() == 2 && session.is_connected()).await;

    // THEN: The request failed with Closed, and the session came back
    assert!(matches!(dropped, Err(GatewayError::Closed { .. })));
    assert_eq!(gateway.connections(), 2);
    let echoed = session.request("echo", json!({ "after": "reconnect" })).await.unwrap();
    assert_eq!(echoed, json!({ "after": "reconnect" }));
    session.disconnect().await;
}
