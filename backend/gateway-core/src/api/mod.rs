//! Typed operations on top of [`GatewaySession::request`].
//!
//! Each client holds a clone of the session handle and turns `ok: false`
//! responses into [`ApiError::Rejected`] with the gateway's
//! message, or an operation-specific default when the gateway sent none.
//!
//! [`GatewaySession::request`]: crate::session::GatewaySession::request
//! [`ApiError::Rejected`]: crate::error::ApiError::Rejected

pub mod config;
pub mod files;
pub mod status;

pub use config::{ConfigClient, ConfigSnapshot, parse_lenient};
pub use files::{AgentFileEntry, AgentFilesClient};
pub use status::StatusClient;

use crate::error::api::ApiError;
use crate::session::GatewaySession;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Delay the gateway waits before restarting after a config patch or apply.
pub const CONFIG_RESTART_DELAY_MS: u64 = 2_000;

/// Issue `method` and map failures to [`ApiError`].
pub(crate) async fn call(
    session: &GatewaySession,
    method: &str,
    params: Value,
    default_message: &str,
) -> Result<Value, ApiError> {
    session
        .request(method, params)
        .await
        .map_err(|e| ApiError::from_gateway(e, method, default_message))
}

/// Issue `method` and decode its payload as `T`.
pub(crate) async fn call_typed<T: DeserializeOwned>(
    session: &GatewaySession,
    method: &str,
    params: Value,
    default_message: &str,
) -> Result<T, ApiError> {
    let payload = call(session, method, params, default_message).await?;
    serde_json::from_value(payload).map_err(|e| ApiError::decode(method, e))
}

/// Payload as a JSON object; an absent payload is the empty object.
pub(crate) fn object_or_empty(payload: Value) -> Value {
    match payload {
        Value::Null => Value::Object(Default::default()),
        other => other,
    }
}
