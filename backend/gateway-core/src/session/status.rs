//! Connection status and its observers.

use crate::session::observers::{Observers, invoke_isolated, lock_unpoisoned};

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::watch;

/// Session status. Exactly one value is current at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No session, or the last one ended without ever connecting.
    Disconnected,

    /// First connect attempt in progress.
    Connecting,

    /// Connect attempt after a previously successful session.
    Reconnecting,

    /// Handshake accepted; requests can be issued.
    Connected,

    /// Handshake rejected or the first transport failed. Needs a new connect.
    Error,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }

    /// Connected, or recovering from a dropped connection.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ConnectionStatus::Connected | ConnectionStatus::Reconnecting
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Reconnecting => "reconnecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        }
    }
}

impl Display for ConnectionStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}

pub type StatusListener = dyn Fn(ConnectionStatus) + Send + Sync;

/// Token returned by `on_status_change`, used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ListenerSet {
    next_id: u64,
    listeners: Observers<StatusListener>,
}

/// Current status plus everyone watching it.
///
/// Written only by the session task; read from any handle.
pub(crate) struct StatusBroadcaster {
    current: watch::Sender<ConnectionStatus>,
    listeners: Mutex<ListenerSet>,
}

impl StatusBroadcaster {
    pub(crate) fn new() -> Self {
        let (current, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            current,
            listeners: Mutex::new(ListenerSet {
                next_id: 0,
                listeners: Observers::new(),
            }),
        }
    }

    pub(crate) fn current(&self) -> ConnectionStatus {
        *self.current.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.current.subscribe()
    }

    pub(crate) fn add_listener(&self, listener: Arc<StatusListener>) -> ListenerId {
        let mut set = lock_unpoisoned(&self.listeners);
        set.next_id += 1;
        let id = set.next_id;
        set.listeners.push(id, listener);
        ListenerId(id)
    }

    pub(crate) fn remove_listener(&self, id: ListenerId) -> bool {
        lock_unpoisoned(&self.listeners).listeners.remove(id.0)
    }

    /// Store `status` and call every listener, in registration order.
    pub(crate) fn set(&self, status: ConnectionStatus) {
        self.current.send_replace(status);

        let listeners = lock_unpoisoned(&self.listeners).listeners.snapshot();
        for listener in listeners {
            invoke_isolated("Status listener", || listener(status));
        }
    }
}
