//! Message transport underneath the gateway session.
//!
//! The session never touches sockets directly. A [`Connector`] opens a
//! [`Transport`], which is just a pair of channels:
//!
//! - outgoing text frames, written by the session
//! - incoming [`TransportEvent`]s, read by the session
//!
//! Whoever holds the other ends (the [`TransportPeer`]) does the actual I/O.
//! [`WsConnector`] drives a WebSocket; tests drive the peer by hand.
//!
//! Dropping a `Transport` detaches it. Its peer notices the closed channels and
//! winds down, and nothing it reports afterwards reaches the session. This is
//! how a session replaces a transport without running its close handling.

mod ws;

pub use ws::WsConnector;

use crate::error::gateway::GatewayError;

use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

/// What a transport reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One inbound text message.
    Message(String),

    /// A transport-level failure. Normally followed by `Closed`.
    Error(String),

    /// The transport is gone.
    Closed,
}

/// Opens transports to a gateway URL.
///
/// The returned future resolving to `Ok` means "transport open".
pub trait Connector: Send + Sync + 'static {
    fn open(&self, url: &str) -> BoxFuture<'static, Result<Transport, GatewayError>>;
}

/// Session-side ends of an open transport.
pub struct Transport {
    outgoing: mpsc::UnboundedSender<String>,
    incoming: mpsc::UnboundedReceiver<TransportEvent>,
}

/// I/O-side ends of an open transport.
pub struct TransportPeer {
    /// Frames the session asked to send.
    pub outgoing: mpsc::UnboundedReceiver<String>,

    /// Events to deliver to the session.
    pub incoming: mpsc::UnboundedSender<TransportEvent>,
}

impl Transport {
    /// Create a connected transport/peer pair.
    pub fn pair() -> (Transport, TransportPeer) {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        (
            Transport {
                outgoing: outgoing_tx,
                incoming: incoming_rx,
            },
            TransportPeer {
                outgoing: outgoing_rx,
                incoming: incoming_tx,
            },
        )
    }

    /// Whether frames can still be written.
    pub fn is_ready(&self) -> bool {
        !self.outgoing.is_closed()
    }

    pub fn send(&self, text: String) -> Result<(), GatewayError> {
        self.outgoing
            .send(text)
            .map_err(|_| GatewayError::transport("Transport writer has shut down"))
    }

    /// Next event from the peer. A vanished peer reads as `Closed`.
    pub(crate) async fn next_event(&mut self) -> TransportEvent {
        self.incoming.recv().await.unwrap_or(TransportEvent::Closed)
    }
}
