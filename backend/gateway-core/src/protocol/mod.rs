//! Gateway wire protocol.
//!
//! Frames are JSON objects discriminated by `type`:
//! - `req`   client → gateway request, correlated by `id`
//! - `res`   gateway → client response carrying the request `id`
//! - `event` gateway → client notification, optionally sequenced
//!
//! The session always opens with the `connect` handshake, sent with the
//! reserved id [`CONNECT_REQUEST_ID`], optionally after a
//! [`CHALLENGE_EVENT`] from the gateway.

pub mod frame;
pub mod handshake;
pub mod url;

pub use frame::{Frame, GatewayEvent, GatewayRequest, GatewayResponse, ResponseError};
pub use handshake::{ClientIdentity, ClientInfo, ConnectAuth, ConnectParams};
pub use url::normalize_gateway_url;

/// Protocol version advertised as both lower and upper bound.
pub const PROTOCOL_VERSION: u32 = 3;

pub const CONNECT_METHOD: &str = "connect";

/// Fixed correlation id of the connect handshake. Never produced by the
/// general request id sequence.
pub const CONNECT_REQUEST_ID: &str = "connect-1";

pub const CHALLENGE_EVENT: &str = "connect.challenge";

pub const REQUEST_ID_PREFIX: &str = "req-";

/// Methods consumed by the typed wrappers in [`crate::api`].
pub mod methods {
    pub const CONFIG_GET: &str = "config.get";
    pub const CONFIG_PATCH: &str = "config.patch";
    pub const CONFIG_SET: &str = "config.set";
    pub const CONFIG_APPLY: &str = "config.apply";
    pub const STATUS: &str = "status";
    pub const HEALTH: &str = "health";
    pub const SESSIONS_LIST: &str = "sessions.list";
    pub const AGENTS_FILES_LIST: &str = "agents.files.list";
    pub const AGENTS_FILES_GET: &str = "agents.files.get";
    pub const AGENTS_FILES_SET: &str = "agents.files.set";
}
