//! Per-attempt state of the connect handshake.
//!
//! After the transport opens nothing is sent until either:
//! - a `connect.challenge` event arrives (its nonce is echoed), or
//! - the fallback timer fires with no challenge seen (sent without a nonce).
//!
//! Whichever comes first sends the handshake; the other becomes a no-op.

use crate::protocol::{CONNECT_REQUEST_ID, ClientIdentity, ConnectParams};
use crate::session::timer::TimerHandle;

use common::RedactedToken;

#[derive(Default)]
pub(crate) struct HandshakeState {
    nonce: Option<String>,
    sent: bool,
    completed: bool,
    fallback: Option<TimerHandle>,
}

impl HandshakeState {
    /// Forget the previous attempt. Cancels its fallback timer.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn arm_fallback(&mut self, timer: TimerHandle) {
        self.fallback = Some(timer);
    }

    /// Record a challenge. Returns true if the handshake should be sent now.
    pub(crate) fn on_challenge(&mut self, nonce: Option<String>) -> bool {
        self.fallback = None;
        self.nonce = nonce;
        self.can_send()
    }

    /// The fallback timer fired. Returns true if the handshake should be sent now.
    pub(crate) fn on_fallback(&mut self) -> bool {
        self.fallback = None;
        self.can_send()
    }

    pub(crate) fn mark_sent(&mut self) {
        self.sent = true;
    }

    pub(crate) fn complete(&mut self) {
        self.completed = true;
        self.fallback = None;
    }

    #[cfg(test)]
    pub(crate) fn is_sent(&self) -> bool {
        self.sent
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed
    }

    pub(crate) fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn is_fallback_armed(&self) -> bool {
        self.fallback.is_some()
    }

    /// Whether `response_id` is the answer to this attempt's handshake.
    pub(crate) fn awaits_response(&self, response_id: &str) -> bool {
        !self.completed && response_id == CONNECT_REQUEST_ID
    }

    pub(crate) fn params(&self, identity: &ClientIdentity, token: &RedactedToken) -> ConnectParams {
        ConnectParams::new(identity, token, self.nonce())
    }

    fn can_send(&self) -> bool {
        !self.sent && !self.completed
    }
}
