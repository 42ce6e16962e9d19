//! Gateway status, health and session listings.

use crate::api::{call, object_or_empty};
use crate::error::api::ApiError;
use crate::protocol::methods;
use crate::session::GatewaySession;

use serde_json::{Value, json};

/// Read-only views of the gateway. Payloads are passed through untouched.
#[derive(Clone)]
pub struct StatusClient {
    session: GatewaySession,
}

impl StatusClient {
    pub fn new(session: GatewaySession) -> Self {
        Self { session }
    }

    pub async fn status(&self) -> Result<Value, ApiError> {
        self.fetch(methods::STATUS, "Failed to get status").await
    }

    pub async fn health(&self) -> Result<Value, ApiError> {
        self.fetch(methods::HEALTH, "Failed to get health").await
    }

    pub async fn sessions(&self) -> Result<Value, ApiError> {
        self.fetch(methods::SESSIONS_LIST, "Failed to list sessions")
            .await
    }

    async fn fetch(&self, method: &str, default_message: &str) -> Result<Value, ApiError> {
        call(&self.session, method, json!({}), default_message)
            .await
            .map(object_or_empty)
    }
}
