use crate::ErrorLocation;

use thiserror::Error as ThisError;

/// Raised when a redacted secret is asked to serialize itself.
#[derive(Debug, ThisError)]
pub enum RedactError {
    #[error("Serialization Error: {message} {location}")]
    Serialization {
        message: String,
        location: ErrorLocation,
    },
}
