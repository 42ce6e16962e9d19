//! The session task.
//!
//! Owns every piece of mutable protocol state: the transport, the handshake,
//! the request registry and the reconnect timer. It reacts to three inputs,
//! one at a time:
//!
//! - [`Command`]s from `GatewaySession` handles
//! - [`Internal`] messages from its own timers and transport opens
//! - [`TransportEvent`]s from the current transport
//!
//! Because only this task mutates that state, none of it needs a lock.

use crate::error::gateway::GatewayError;
use crate::protocol::{
    CHALLENGE_EVENT, CONNECT_METHOD, CONNECT_REQUEST_ID, Frame, GatewayEvent, GatewayResponse,
    normalize_gateway_url,
};
use crate::session::events::dispatch;
use crate::session::handshake::HandshakeState;
use crate::session::reconnect::ReconnectScheduler;
use crate::session::registry::{Reply, RequestRegistry};
use crate::session::timer::Timers;
use crate::session::{ConnectionStatus, SessionConfig, SessionShared};
use crate::transport::{Connector, Transport, TransportEvent};

use common::{ErrorLocation, RedactedToken};

use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use log::{debug, error, info, warn};
use serde_json::Value;
use tokio::spawn as TokioSpawn;
use tokio::sync::{mpsc, oneshot};

/// Requests from session handles.
pub(crate) enum Command {
    Connect {
        gateway_url: String,
        token: RedactedToken,
        reply: Reply<()>,
    },
    Request {
        method: String,
        params: Value,
        reply: Reply<Value>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
}

/// Messages the session task posts to itself.
pub(crate) enum Internal {
    Opened {
        attempt: u64,
        result: Result<Transport, GatewayError>,
    },
    HandshakeFallback {
        attempt: u64,
    },
    RequestTimedOut {
        id: String,
    },
    ReconnectDue {
        generation: u64,
    },
}

struct Credentials {
    gateway_url: String,
    token: RedactedToken,
}

pub(crate) struct SessionActor {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    shared: Arc<SessionShared>,
    commands: mpsc::UnboundedReceiver<Command>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    timers: Timers<Internal>,
    transport: Option<Transport>,
    /// Bumped for every connect attempt and on disconnect; stale opens and
    /// fallback timers carry an older value.
    attempt: u64,
    credentials: Option<Credentials>,
    pending_connect: Option<Reply<()>>,
    handshake: HandshakeState,
    registry: RequestRegistry,
    reconnect: ReconnectScheduler,
    /// The current attempt was started by the reconnect timer, not a caller.
    retrying: bool,
}

impl SessionActor {
    pub(crate) fn new(
        config: SessionConfig,
        connector: Arc<dyn Connector>,
        shared: Arc<SessionShared>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let timers = Timers::new(internal_tx.clone());
        let registry = RequestRegistry::new(config.request_timeout);
        let reconnect = ReconnectScheduler::new(config.reconnect_delay);

        Self {
            config,
            connector,
            shared,
            commands,
            internal_tx,
            internal_rx,
            timers,
            transport: None,
            attempt: 0,
            credentials: None,
            pending_connect: None,
            handshake: HandshakeState::default(),
            registry,
            reconnect,
            retrying: false,
        }
    }

    /// Run until every session handle is dropped.
    pub(crate) async fn run(mut self) {
        info!("Gateway session task started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(internal) = self.internal_rx.recv() => self.handle_internal(internal),
                event = next_transport_event(&mut self.transport) => self.handle_transport_event(event),
            }
        }

        self.disconnect("Gateway session dropped");
        info!("Gateway session task stopped");
    }

    // ------------------------------------------------------------------ //
    // Commands
    // ------------------------------------------------------------------ //

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect {
                gateway_url,
                token,
                reply,
            } => {
                if let Some(previous) = self.pending_connect.replace(reply) {
                    let _ = previous.send(Err(GatewayError::closed(
                        "Connection attempt superseded by a newer connect call",
                    )));
                }
                self.credentials = Some(Credentials { gateway_url, token });
                self.shared.has_credentials.store(true, Ordering::SeqCst);
                self.retrying = false;
                self.start_attempt();
            }
            Command::Request {
                method,
                params,
                reply,
            } => self.send_request(method, params, reply),
            Command::Disconnect { reply } => {
                self.disconnect("Disconnected by client");
                let _ = reply.send(());
            }
        }
    }

    /// Run the full connect sequence with the stored credentials.
    fn start_attempt(&mut self) {
        let Some(credentials) = self.credentials.as_ref() else {
            warn!("Connect attempt requested without credentials");
            return;
        };
        let url = normalize_gateway_url(&credentials.gateway_url);

        self.reconnect.cancel();
        self.handshake.reset();
        self.detach_transport("Connection replaced by a new attempt");

        self.attempt += 1;
        let attempt = self.attempt;

        let status = if self.retrying {
            ConnectionStatus::Reconnecting
        } else {
            ConnectionStatus::Connecting
        };
        self.set_status(status);

        info!("Opening gateway transport to {url} (attempt {attempt})");
        let open = self.connector.open(&url);
        let internal_tx = self.internal_tx.clone();
        TokioSpawn(async move {
            let result = open.await;
            let _ = internal_tx.send(Internal::Opened { attempt, result });
        });
    }

    fn send_request(&mut self, method: String, params: Value, reply: Reply<Value>) {
        if !self.transport_ready() {
            let _ = reply.send(Err(GatewayError::NotConnected {
                message: format!("Not connected to gateway (request {method})"),
                location: ErrorLocation::from(Location::caller()),
            }));
            return;
        }

        let id = self.registry.next_id();
        let deadline = self.timers.after(
            self.registry.timeout(),
            Internal::RequestTimedOut { id: id.clone() },
        );
        self.registry
            .register(id.clone(), method.clone(), reply, deadline);

        let frame = Frame::request(id.clone(), method.clone(), params);
        match self.send_frame(&frame) {
            Ok(()) => debug!("Sent request {id} ({method})"),
            Err(e) => {
                warn!("Failed to send request {id} ({method}): {e}");
                self.registry.fail(&id, e);
            }
        }
    }

    /// Tear the session down. Credentials are cleared, so nothing reconnects.
    fn disconnect(&mut self, reason: &str) {
        info!("Disconnecting from gateway: {reason}");

        self.reconnect.cancel();
        self.reconnect.reset();
        self.handshake.reset();
        self.retrying = false;
        self.credentials = None;
        self.shared.has_credentials.store(false, Ordering::SeqCst);
        self.attempt += 1;

        self.detach_transport(reason);
        self.fail_pending_connect(GatewayError::closed(reason));
        self.set_status(ConnectionStatus::Disconnected);
    }

    // ------------------------------------------------------------------ //
    // Timers and transport opens
    // ------------------------------------------------------------------ //

    fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::Opened { attempt, result } => {
                if attempt != self.attempt {
                    debug!("Discarding transport from superseded attempt {attempt}");
                    return;
                }
                match result {
                    Ok(transport) => self.on_transport_open(transport),
                    Err(e) => {
                        warn!("Failed to open gateway transport: {e}");
                        self.fail_attempt(e);
                    }
                }
            }
            Internal::HandshakeFallback { attempt } => {
                if attempt != self.attempt || !self.transport_ready() {
                    return;
                }
                if self.handshake.on_fallback() {
                    info!(
                        "No {CHALLENGE_EVENT} within {:?}, sending handshake without nonce",
                        self.config.handshake_fallback
                    );
                    self.send_handshake();
                }
            }
            Internal::RequestTimedOut { id } => {
                if self.registry.expire(&id) {
                    warn!("Request {id} timed out after {:?}", self.registry.timeout());
                }
            }
            Internal::ReconnectDue { generation } => {
                if self.reconnect.take_due(generation) && self.credentials.is_some() {
                    info!("Reconnecting to gateway (retry {})", self.reconnect.attempts());
                    self.retrying = true;
                    self.start_attempt();
                }
            }
        }
    }

    fn on_transport_open(&mut self, transport: Transport) {
        self.transport = Some(transport);
        self.shared.transport_ready.store(true, Ordering::SeqCst);

        let fallback = self.timers.after(
            self.config.handshake_fallback,
            Internal::HandshakeFallback {
                attempt: self.attempt,
            },
        );
        self.handshake.arm_fallback(fallback);
        debug!(
            "Transport open, waiting up to {:?} for {CHALLENGE_EVENT}",
            self.config.handshake_fallback
        );
    }

    // ------------------------------------------------------------------ //
    // Transport events
    // ------------------------------------------------------------------ //

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message(text) => self.on_message(&text),
            TransportEvent::Error(message) => self.on_transport_error(&message),
            TransportEvent::Closed => self.on_transport_closed(),
        }
    }

    fn on_message(&mut self, text: &str) {
        let Some(frame) = Frame::decode(text) else {
            return;
        };

        match frame {
            Frame::Event(event) if event.event == CHALLENGE_EVENT => self.on_challenge(&event),
            Frame::Response(response) if self.handshake.awaits_response(&response.id) => {
                self.on_handshake_response(response)
            }
            Frame::Response(response) => {
                self.registry.complete(response);
            }
            Frame::Event(event) => {
                let delivered = dispatch(&self.shared.dispatcher, &event);
                debug!("Event {} delivered to {delivered} handler(s)", event.event);
            }
            Frame::Request(request) => {
                debug!(
                    "Ignoring gateway-initiated request {} ({})",
                    request.id, request.method
                );
            }
        }
    }

    fn on_challenge(&mut self, event: &GatewayEvent) {
        let nonce = event.payload_str("nonce").map(str::to_string);
        debug!(
            "Received {CHALLENGE_EVENT} (nonce present: {})",
            nonce.is_some()
        );

        if self.handshake.on_challenge(nonce) {
            self.send_handshake();
        } else {
            debug!("Handshake already sent for this attempt, challenge not answered again");
        }
    }

    fn send_handshake(&mut self) {
        let Some(credentials) = self.credentials.as_ref() else {
            return;
        };
        let params = self.handshake.params(&self.config.identity, &credentials.token);
        let params = match serde_json::to_value(params) {
            Ok(params) => params,
            Err(e) => {
                error!("Failed to encode connect params: {e}");
                return;
            }
        };

        let frame = Frame::request(CONNECT_REQUEST_ID, CONNECT_METHOD, params);
        match self.send_frame(&frame) {
            Ok(()) => {
                self.handshake.mark_sent();
                debug!(
                    "Sent connect handshake (nonce: {})",
                    self.handshake.nonce().is_some()
                );
            }
            Err(e) => warn!("Failed to send connect handshake: {e}"),
        }
    }

    fn on_handshake_response(&mut self, response: GatewayResponse) {
        if response.ok {
            self.handshake.complete();
            self.retrying = false;
            self.reconnect.reset();
            info!("Gateway handshake accepted");
            self.set_status(ConnectionStatus::Connected);
            if let Some(reply) = self.pending_connect.take() {
                let _ = reply.send(Ok(()));
            }
        } else {
            let message = response
                .error
                .map(|e| e.message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| String::from("Connection rejected"));
            error!("Gateway handshake rejected: {message}");
            self.set_status(ConnectionStatus::Error);
            self.fail_pending_connect(GatewayError::HandshakeRejected {
                message,
                location: ErrorLocation::from(Location::caller()),
            });
        }
    }

    fn on_transport_error(&mut self, message: &str) {
        warn!("Gateway transport error: {message}");
        if !self.handshake.is_completed() && !self.retrying {
            self.set_status(ConnectionStatus::Error);
            self.fail_pending_connect(GatewayError::transport(format!(
                "WebSocket connection failed: {message}"
            )));
        }
    }

    fn on_transport_closed(&mut self) {
        let was_connected = self.handshake.is_completed();

        self.transport = None;
        self.shared.transport_ready.store(false, Ordering::SeqCst);
        self.handshake.reset();

        let rejected = self.registry.reject_all("WebSocket closed");
        if rejected > 0 {
            warn!("Gateway transport closed with {rejected} request(s) pending");
        }
        self.fail_pending_connect(GatewayError::closed(
            "WebSocket closed before the handshake completed",
        ));

        let current = self.shared.status.current();
        let retry = self.credentials.is_some()
            && (was_connected || (self.retrying && current != ConnectionStatus::Error));

        if retry {
            info!("Gateway transport closed unexpectedly");
            self.set_status(ConnectionStatus::Reconnecting);
            self.schedule_reconnect();
        } else if current != ConnectionStatus::Error {
            info!("Gateway transport closed");
            self.set_status(ConnectionStatus::Disconnected);
        }
    }

    // ------------------------------------------------------------------ //
    // Helpers
    // ------------------------------------------------------------------ //

    /// A connect attempt failed before any handshake completed. Only retries
    /// keep retrying; a failed explicit connect ends in `Error`.
    fn fail_attempt(&mut self, error: GatewayError) {
        if self.retrying && self.credentials.is_some() {
            self.set_status(ConnectionStatus::Reconnecting);
            self.fail_pending_connect(error);
            self.schedule_reconnect();
        } else {
            self.set_status(ConnectionStatus::Error);
            self.fail_pending_connect(error);
        }
    }

    fn schedule_reconnect(&mut self) {
        if let Some(delay) = self.reconnect.schedule(&self.timers) {
            info!("Reconnect scheduled in {delay:?}");
        }
    }

    /// Drop the current transport without running its close handling.
    fn detach_transport(&mut self, reason: &str) {
        if self.transport.take().is_some() {
            self.shared.transport_ready.store(false, Ordering::SeqCst);
            debug!("Detached gateway transport: {reason}");
        }
        let rejected = self.registry.reject_all(reason);
        if rejected > 0 {
            warn!("Rejected {rejected} pending request(s): {reason}");
        }
    }

    fn fail_pending_connect(&mut self, error: GatewayError) {
        if let Some(reply) = self.pending_connect.take() {
            let _ = reply.send(Err(error));
        }
    }

    fn send_frame(&self, frame: &Frame) -> Result<(), GatewayError> {
        let transport = self.transport.as_ref().ok_or_else(|| GatewayError::NotConnected {
            message: String::from("No open transport"),
            location: ErrorLocation::from(Location::caller()),
        })?;
        let text = frame
            .encode()
            .map_err(|e| GatewayError::transport(format!("Failed to encode frame: {e}")))?;
        transport.send(text)
    }

    fn transport_ready(&self) -> bool {
        self.transport.as_ref().is_some_and(Transport::is_ready)
    }

    fn set_status(&self, status: ConnectionStatus) {
        debug!("Gateway status -> {status}");
        self.shared.status.set(status);
    }
}

async fn next_transport_event(transport: &mut Option<Transport>) -> TransportEvent {
    match transport {
        Some(transport) => transport.next_event().await,
        None => std::future::pending().await,
    }
}
