use common::ErrorLocation;

use gateway_core::{ApiError, ConfigError, GatewayError};

use thiserror::Error;

/// Errors surfaced by the `gatewayctl` binary.
#[derive(Debug, Error)]
pub enum GatewayCtlError {
    /// Error from this app (logger, filesystem, runtime)
    #[error("Gatewayctl Error: {message} {location}")]
    Gatewayctl {
        message: String,
        location: ErrorLocation,
    },

    /// A required setting was given neither on the command line nor in the config
    #[error("Missing Setting Error: {message} {location}")]
    MissingSetting {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
