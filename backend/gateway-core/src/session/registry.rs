//! Outstanding request bookkeeping.

use crate::error::gateway::GatewayError;
use crate::protocol::{GatewayResponse, REQUEST_ID_PREFIX};
use crate::session::timer::{TimerHandle, millis};

use common::ErrorLocation;

use std::collections::HashMap;
use std::panic::Location;
use std::time::Duration;

use log::debug;
use serde_json::Value;
use tokio::sync::oneshot;

pub(crate) type Reply<T> = oneshot::Sender<Result<T, GatewayError>>;

/// One request waiting for its response.
///
/// Owned by the registry only; removing the entry drops `deadline`, which
/// cancels the timeout.
pub(crate) struct PendingRequest {
    method: String,
    reply: Reply<Value>,
    deadline: TimerHandle,
}

impl PendingRequest {
    fn settle(self, result: Result<Value, GatewayError>) {
        drop(self.deadline);
        // Caller may have stopped waiting; nothing to do then.
        let _ = self.reply.send(result);
    }
}

/// Requests in flight, keyed by correlation id.
pub(crate) struct RequestRegistry {
    next_sequence: u64,
    timeout: Duration,
    pending: HashMap<String, PendingRequest>,
}

impl RequestRegistry {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            next_sequence: 0,
            timeout,
            pending: HashMap::new(),
        }
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Next correlation id. Strictly increasing for the registry's lifetime.
    pub(crate) fn next_id(&mut self) -> String {
        self.next_sequence += 1;
        format!("{REQUEST_ID_PREFIX}{}", self.next_sequence)
    }

    pub(crate) fn register(&mut self, id: String, method: String, reply: Reply<Value>, deadline: TimerHandle) {
        let previous = self.pending.insert(
            id,
            PendingRequest {
                method,
                reply,
                deadline,
            },
        );
        debug_assert!(previous.is_none(), "request ids must not repeat");
    }

    /// Settle the request `response` answers. Unknown ids are ignored.
    pub(crate) fn complete(&mut self, response: GatewayResponse) -> bool {
        let Some(pending) = self.pending.remove(&response.id) else {
            debug!("Ignoring response for unknown request id {}", response.id);
            return false;
        };

        let result = if response.ok {
            Ok(response.payload.unwrap_or(Value::Null))
        } else {
            let error = response.error.unwrap_or_default();
            Err(GatewayError::Remote {
                kind: error.kind,
                message: error.message,
                location: ErrorLocation::from(Location::caller()),
            })
        };
        debug!("Request {} ({}) settled", response.id, pending.method);
        pending.settle(result);
        true
    }

    /// Fail request `id` with a timeout, if it is still pending.
    pub(crate) fn expire(&mut self, id: &str) -> bool {
        let Some(pending) = self.pending.remove(id) else {
            return false;
        };
        let error = GatewayError::Timeout {
            method: pending.method.clone(),
            timeout_ms: millis(self.timeout),
            location: ErrorLocation::from(Location::caller()),
        };
        pending.settle(Err(error));
        true
    }

    pub(crate) fn fail(&mut self, id: &str, error: GatewayError) -> bool {
        match self.pending.remove(id) {
            Some(pending) => {
                pending.settle(Err(error));
                true
            }
            None => false,
        }
    }

    /// Fail every pending request with a `Closed` error. Returns how many.
    pub(crate) fn reject_all(&mut self, reason: &str) -> usize {
        let count = self.pending.len();
        for (_, pending) in self.pending.drain() {
            pending.settle(Err(GatewayError::closed(reason)));
        }
        count
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
