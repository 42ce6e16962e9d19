//! Gateway session management using the actor pattern.
//!
//! A [`GatewaySession`] is a cheap, cloneable handle. Behind it one task owns
//! the connection and everything that changes with it:
//! - the current transport and the connect handshake
//! - outstanding requests and their deadlines
//! - the reconnect timer
//!
//! # Architecture
//!
//! - Handles send commands over an mpsc channel
//! - The session task processes commands, timer firings and transport events
//!   one at a time
//! - Status, readiness and handler registries live in [`SessionShared`] so
//!   handles can read them without a round trip
//!
//! # Lifecycle
//!
//! ```text
//! disconnected ──connect──▶ connecting ──handshake ok──▶ connected
//!                               │                          │
//!                        failure│                   closed │
//!                               ▼                          ▼
//!                             error ◀──rejected── reconnecting ──(every 3s)──┐
//!                                                       ▲                    │
//!                                                       └────────────────────┘
//! ```
//!
//! `disconnect` returns to `disconnected` from any state and stops retries.

pub(crate) mod actor;
pub(crate) mod events;
pub(crate) mod handshake;
pub(crate) mod observers;
pub(crate) mod reconnect;
pub(crate) mod registry;
pub(crate) mod status;
pub(crate) mod timer;

pub use events::{EventHandler, EventName, EventSubscription};
pub use status::{ConnectionStatus, ListenerId, StatusListener};

use crate::error::gateway::GatewayError;
use crate::protocol::{ClientIdentity, GatewayEvent};
use crate::transport::{Connector, WsConnector};

use actor::{Command, SessionActor};
use events::EventDispatcher;
use observers::lock_unpoisoned;
use status::StatusBroadcaster;

use common::{ErrorLocation, RedactedToken};

use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::spawn as TokioSpawn;
use tokio::sync::{mpsc, oneshot, watch};

/// Wait after the transport opens before sending the handshake unprompted.
pub const HANDSHAKE_FALLBACK_DELAY: Duration = Duration::from_millis(3_000);

/// Per-request deadline.
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Delay between reconnect attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(3_000);

/// Tunables for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sent in every connect handshake.
    pub identity: ClientIdentity,
    pub handshake_fallback: Duration,
    pub request_timeout: Duration,
    pub reconnect_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identity: ClientIdentity::default(),
            handshake_fallback: HANDSHAKE_FALLBACK_DELAY,
            request_timeout: REQUEST_TIMEOUT,
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// State readable from any handle. Written only by the session task, except
/// the handler registry which handles edit directly.
pub(crate) struct SessionShared {
    pub(crate) status: StatusBroadcaster,
    pub(crate) dispatcher: Mutex<EventDispatcher>,
    pub(crate) transport_ready: AtomicBool,
    pub(crate) has_credentials: AtomicBool,
}

impl SessionShared {
    fn new() -> Self {
        Self {
            status: StatusBroadcaster::new(),
            dispatcher: Mutex::new(EventDispatcher::new()),
            transport_ready: AtomicBool::new(false),
            has_credentials: AtomicBool::new(false),
        }
    }
}

/// Handle to a gateway session.
///
/// All clones drive the same session. The session task stops once every
/// handle has been dropped.
#[derive(Clone)]
pub struct GatewaySession {
    commands: mpsc::UnboundedSender<Command>,
    shared: Arc<SessionShared>,
}

impl GatewaySession {
    /// Session over WebSockets. Must be called within a Tokio runtime.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_connector(config, Arc::new(WsConnector))
    }

    /// Session over a custom transport. Must be called within a Tokio runtime.
    pub fn with_connector(config: SessionConfig, connector: Arc<dyn Connector>) -> Self {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(SessionShared::new());

        let actor = SessionActor::new(config, connector, Arc::clone(&shared), commands_rx);
        TokioSpawn(actor.run());

        Self { commands, shared }
    }

    /// Connect to `gateway_url` and complete the handshake.
    ///
    /// Any existing connection is replaced, and an earlier connect call still
    /// in progress fails with [`GatewayError::Closed`]. The credentials are
    /// kept for automatic reconnects until [`disconnect`](Self::disconnect).
    pub async fn connect(
        &self,
        gateway_url: &str,
        token: impl Into<RedactedToken>,
    ) -> Result<(), GatewayError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Connect {
            gateway_url: gateway_url.to_string(),
            token: token.into(),
            reply,
        })?;
        Self::await_reply(response).await
    }

    /// Issue `method` and wait for its payload.
    ///
    /// Fails immediately with [`GatewayError::NotConnected`] when no transport
    /// is open. Requests may be issued before the handshake completes.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, GatewayError> {
        if !self.shared.transport_ready.load(Ordering::SeqCst) {
            return Err(GatewayError::NotConnected {
                message: format!("Not connected to gateway (request {method})"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let (reply, response) = oneshot::channel();
        self.send(Command::Request {
            method: method.to_string(),
            params,
            reply,
        })?;
        Self::await_reply(response).await
    }

    /// Close the connection and stop reconnecting. Pending requests fail with
    /// [`GatewayError::Closed`].
    pub async fn disconnect(&self) {
        let (reply, done) = oneshot::channel();
        if self.send(Command::Disconnect { reply }).is_ok() {
            let _ = done.await;
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.status.current()
    }

    /// Watch channel of the status, for `await`-style observers.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.subscribe()
    }

    /// Call `listener` on every status assignment, in registration order.
    pub fn on_status_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.shared.status.add_listener(Arc::new(listener))
    }

    pub fn remove_status_listener(&self, id: ListenerId) -> bool {
        self.shared.status.remove_listener(id)
    }

    /// Call `handler` for every event named `name`.
    pub fn on<F>(&self, name: impl Into<EventName>, handler: F) -> EventSubscription
    where
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        lock_unpoisoned(&self.shared.dispatcher).subscribe(name.into(), Arc::new(handler))
    }

    /// Call `handler` for every event, after the name-specific handlers.
    pub fn on_any<F>(&self, handler: F) -> EventSubscription
    where
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        lock_unpoisoned(&self.shared.dispatcher).subscribe(EventName::Wildcard, Arc::new(handler))
    }

    /// Unregister a handler. Returns false if it was already gone.
    pub fn off(&self, subscription: &EventSubscription) -> bool {
        lock_unpoisoned(&self.shared.dispatcher).unsubscribe(subscription)
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Connected, or recovering from a dropped connection.
    pub fn is_active(&self) -> bool {
        self.status().is_active()
    }

    /// Whether credentials are held for reconnecting.
    pub fn has_credentials(&self) -> bool {
        self.shared.has_credentials.load(Ordering::SeqCst)
    }

    #[track_caller]
    fn send(&self, command: Command) -> Result<(), GatewayError> {
        self.commands.send(command).map_err(|_| stopped())
    }

    async fn await_reply<T>(
        response: oneshot::Receiver<Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        response.await.unwrap_or_else(|_| Err(stopped()))
    }
}

#[track_caller]
fn stopped() -> GatewayError {
    GatewayError::SessionStopped {
        message: String::from("Gateway session task is not running"),
        location: ErrorLocation::from(Location::caller()),
    }
}
