use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Failures surfaced by the gateway session.
///
/// Unparsable inbound frames never produce one of these; they are dropped.
#[derive(Debug, Clone, ThisError)]
pub enum GatewayError {
    /// A request was issued while no transport was open.
    #[error("Not Connected Error: {message} {location}")]
    NotConnected {
        message: String,
        location: ErrorLocation,
    },

    /// No response arrived before the request deadline.
    #[error("Timeout Error: request {method} timed out after {timeout_ms}ms {location}")]
    Timeout {
        method: String,
        timeout_ms: u64,
        location: ErrorLocation,
    },

    /// The gateway answered with `ok: false`.
    #[error("Remote Error: {kind}: {message} {location}")]
    Remote {
        kind: String,
        message: String,
        location: ErrorLocation,
    },

    /// The connect handshake was refused.
    #[error("Handshake Rejected Error: {message} {location}")]
    HandshakeRejected {
        message: String,
        location: ErrorLocation,
    },

    /// The transport went away while the call was outstanding.
    #[error("Closed Error: {message} {location}")]
    Closed {
        message: String,
        location: ErrorLocation,
    },

    /// The transport could not be opened or written to.
    #[error("Transport Error: {message} {location}")]
    Transport {
        message: String,
        location: ErrorLocation,
    },

    /// The session task has exited.
    #[error("Session Stopped Error: {message} {location}")]
    SessionStopped {
        message: String,
        location: ErrorLocation,
    },
}

impl GatewayError {
    #[track_caller]
    pub(crate) fn closed(message: impl Into<String>) -> Self {
        GatewayError::Closed {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        GatewayError::Transport {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Server-supplied message for remote and handshake rejections.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            GatewayError::Remote { message, .. } | GatewayError::HandshakeRejected { message, .. } => {
                Some(message)
            }
            _ => None,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for GatewayError {
    #[track_caller]
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        GatewayError::Transport {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<url::ParseError> for GatewayError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        GatewayError::Transport {
            message: format!("Invalid gateway URL: {error}"),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
