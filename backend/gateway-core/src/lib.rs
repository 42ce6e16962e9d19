pub mod api;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

#[cfg(test)]
mod tests;

pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, CoreError, GatewayError};
pub use protocol::{ClientIdentity, GatewayEvent};
pub use session::{ConnectionStatus, EventName, EventSubscription, GatewaySession, SessionConfig};

pub use common::RedactedToken;
