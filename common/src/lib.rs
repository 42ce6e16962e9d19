//! Shared building blocks for the gateway client workspace.
//!
//! - [`ErrorLocation`] is embedded in every error variant across the workspace
//!   so a logged error always points at the line that produced it.
//! - [`RedactedToken`] wraps the gateway credential so it cannot leak through
//!   `Debug`, `Display` or serialization.

pub mod error;
pub mod redacted_token;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_token::RedactedToken;
