use crate::error::gateway::GatewayError;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Failures of the typed gateway operations built on `GatewaySession::request`.
#[derive(Debug, ThisError)]
pub enum ApiError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The gateway refused the operation (`ok: false`).
    ///
    /// Config writes carrying a stale `baseHash` end up here.
    #[error("Rejected Error: {operation}: {message} {location}")]
    Rejected {
        operation: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Decode Error: {operation}: {message} {location}")]
    Decode {
        operation: String,
        message: String,
        location: ErrorLocation,
    },
}

impl ApiError {
    /// Turn a session error into the domain error for `operation`.
    ///
    /// Remote rejections keep the server message; an empty one falls back to
    /// `default_message`.
    #[track_caller]
    pub(crate) fn from_gateway(error: GatewayError, operation: &str, default_message: &str) -> Self {
        match error {
            GatewayError::Remote { message, .. } => ApiError::Rejected {
                operation: operation.to_string(),
                message: if message.is_empty() {
                    default_message.to_string()
                } else {
                    message
                },
                location: ErrorLocation::from(Location::caller()),
            },
            other => ApiError::Gateway(other),
        }
    }

    #[track_caller]
    pub(crate) fn decode(operation: &str, error: serde_json::Error) -> Self {
        ApiError::Decode {
            operation: operation.to_string(),
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
