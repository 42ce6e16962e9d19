//! A minimal gateway for integration tests.
//!
//! Speaks just enough of the protocol to exercise a real WebSocket session:
//! - sends `connect.challenge` on accept and checks the echoed nonce and token
//! - answers `echo` with its params, `emit` by broadcasting a `tick` event,
//!   and `drop` by closing the socket without a response
//! - anything else gets `ok: false` with type `unknown_method`

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};

pub const GOOD_TOKEN: &str = "good-token";
pub const CHALLENGE_NONCE: &str = "integration-nonce";

pub struct FakeGateway {
    pub port: u16,
    connections: Arc<AtomicUsize>,
}

impl FakeGateway {
    pub fn url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// WebSocket connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Start the gateway on an ephemeral port.
pub async fn start_gateway() -> FakeGateway {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test gateway");
    let port = listener.local_addr().expect("local addr").port();
    let connections = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&connections);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(serve_connection(stream));
        }
    });

    FakeGateway { port, connections }
}

/// A port nothing listens on.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe listener");
    listener.local_addr().expect("local addr").port()
}

async fn serve_connection(stream: TcpStream) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };

    let challenge = json!({
        "type": "event",
        "event": "connect.challenge",
        "payload": { "nonce": CHALLENGE_NONCE }
    });
    if ws.send(Message::text(challenge.to_string())).await.is_err() {
        return;
    }

    while let Some(Ok(message)) = ws.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) else {
            continue;
        };
        let id = frame["id"].clone();
        let method = frame["method"].as_str().unwrap_or_default().to_string();

        let replies = match method.as_str() {
            "connect" => vec![handshake_reply(&id, &frame["params"])],
            "echo" => vec![json!({ "type": "res", "id": id, "ok": true, "payload": frame["params"] })],
            "emit" => vec![
                json!({ "type": "res", "id": id, "ok": true }),
                json!({ "type": "event", "event": "tick", "payload": { "n": 1 }, "seq": 1 }),
            ],
            "drop" => {
                let _ = ws.close(None).await;
                return;
            }
            other => vec![json!({
                "type": "res",
                "id": id,
                "ok": false,
                "error": { "type": "unknown_method", "message": format!("unknown method {other}") }
            })],
        };

        for reply in replies {
            if ws.send(Message::text(reply.to_string())).await.is_err() {
                return;
            }
        }
    }
}

fn handshake_reply(id: &Value, params: &Value) -> Value {
    if params["auth"]["token"] != GOOD_TOKEN {
        return json!({
            "type": "res", "id": id, "ok": false,
            "error": { "type": "auth", "message": "invalid token" }
        });
    }
    if params["nonce"] != CHALLENGE_NONCE {
        return json!({
            "type": "res", "id": id, "ok": false,
            "error": { "type": "auth", "message": "nonce mismatch" }
        });
    }
    json!({ "type": "res", "id": id, "ok": true, "payload": { "protocol": 3 } })
}
