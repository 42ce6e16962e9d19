// In-memory transport for driving a session from a test.

use crate::error::gateway::GatewayError;
use crate::session::{GatewaySession, SessionConfig};
use crate::transport::{Connector, Transport, TransportEvent};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures_util::future::BoxFuture;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub(crate) const TEST_URL: &str = "gateway.test:18789";
pub(crate) const TEST_TOKEN: &str = "test-token";

/// The test's side of one opened transport.
pub(crate) struct FakeLink {
    pub(crate) url: String,
    pub(crate) sent: mpsc::UnboundedReceiver<String>,
    pub(crate) events: mpsc::UnboundedSender<TransportEvent>,
}

impl FakeLink {
    /// Next frame the session wrote, parsed.
    pub(crate) async fn recv_frame(&mut self) -> Value {
        let text = self.sent.recv().await.expect("session should send a frame");
        serde_json::from_str(&text).expect("session frames are JSON")
    }

    /// Whether the session has dropped its end of this link.
    pub(crate) async fn is_detached(&mut self) -> bool {
        self.sent.recv().await.is_none()
    }

    pub(crate) fn push_text(&self, text: &str) {
        let _ = self.events.send(TransportEvent::Message(text.to_string()));
    }

    pub(crate) fn push(&self, frame: Value) {
        self.push_text(&frame.to_string());
    }

    pub(crate) fn push_event(&self, event: &str, payload: Value) {
        self.push(json!({ "type": "event", "event": event, "payload": payload }));
    }

    pub(crate) fn challenge(&self, nonce: &str) {
        self.push_event("connect.challenge", json!({ "nonce": nonce }));
    }

    pub(crate) fn respond_ok(&self, id: &str, payload: Value) {
        self.push(json!({ "type": "res", "id": id, "ok": true, "payload": payload }));
    }

    pub(crate) fn respond_error(&self, id: &str, kind: &str, message: &str) {
        self.push(json!({
            "type": "res",
            "id": id,
            "ok": false,
            "error": { "type": kind, "message": message }
        }));
    }

    pub(crate) fn close(&self) {
        let _ = self.events.send(TransportEvent::Closed);
    }

    /// Answer the challenge and accept the handshake.
    pub(crate) async fn accept_handshake(&mut self) -> Value {
        self.challenge("nonce-1");
        let handshake = self.recv_frame().await;
        assert_eq!(handshake["method"], "connect");
        self.respond_ok("connect-1", json!({}));
        handshake
    }
}

/// Hands every opened transport to the test. Can be told to refuse.
pub(crate) struct FakeConnector {
    links: mpsc::UnboundedSender<FakeLink>,
    refuse: AtomicBool,
    opens: AtomicUsize,
}

impl FakeConnector {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakeLink>) {
        let (links, links_rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            links,
            refuse: AtomicBool::new(false),
            opens: AtomicUsize::new(0),
        });
        (connector, links_rx)
    }

    pub(crate) fn set_refusing(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub(crate) fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    fn open(&self, url: &str) -> BoxFuture<'static, Result<Transport, GatewayError>> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        if self.refuse.load(Ordering::SeqCst) {
            return Box::pin(async { Err(GatewayError::transport("connection refused")) });
        }

        let (transport, peer) = Transport::pair();
        let _ = self.links.send(FakeLink {
            url: url.to_string(),
            sent: peer.outgoing,
            events: peer.incoming,
        });
        Box::pin(async move { Ok(transport) })
    }
}

pub(crate) struct Harness {
    pub(crate) session: GatewaySession,
    pub(crate) connector: Arc<FakeConnector>,
    pub(crate) links: mpsc::UnboundedReceiver<FakeLink>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub(crate) fn with_config(config: SessionConfig) -> Self {
        let (connector, links) = FakeConnector::new();
        let session = GatewaySession::with_connector(config, connector.clone());
        Self {
            session,
            connector,
            links,
        }
    }

    /// Start `connect` in the background.
    pub(crate) fn spawn_connect(&self) -> JoinHandle<Result<(), GatewayError>> {
        let session = self.session.clone();
        tokio::spawn(async move { session.connect(TEST_URL, TEST_TOKEN).await })
    }

    /// Start `request` in the background.
    pub(crate) fn spawn_request(
        &self,
        method: &str,
        params: Value,
    ) -> JoinHandle<Result<Value, GatewayError>> {
        let session = self.session.clone();
        let method = method.to_string();
        tokio::spawn(async move { session.request(&method, params).await })
    }

    pub(crate) async fn next_link(&mut self) -> FakeLink {
        self.links.recv().await.expect("connector should open a link")
    }

    /// Connect and complete the handshake. Returns the live link.
    pub(crate) async fn connected(&mut self) -> FakeLink {
        let connect = self.spawn_connect();
        let mut link = self.next_link().await;
        link.accept_handshake().await;
        connect
            .await
            .expect("connect task")
            .expect("connect should succeed");
        link
    }
}
