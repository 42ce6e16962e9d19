//! Parameters of the `connect` handshake request.

use crate::protocol::PROTOCOL_VERSION;

use common::RedactedToken;

use std::collections::BTreeMap;
use std::fmt;

use const_format::concatcp;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CLIENT_ID: &str = "openclaw-control-ui";
pub const DEFAULT_CLIENT_MODE: &str = "webchat";
pub const DEFAULT_ROLE: &str = "operator";
pub const DEFAULT_SCOPES: [&str; 3] = ["operator.admin", "operator.approvals", "operator.pairing"];
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const USER_AGENT: &str = concatcp!("gateway-core/", CLIENT_VERSION);

/// Who this client claims to be, and what it asks for, in the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub client_id: String,
    pub client_version: String,
    pub platform: String,
    pub mode: String,
    pub role: String,
    pub scopes: Vec<String>,
    pub locale: Option<String>,
    pub user_agent: Option<String>,
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_version: CLIENT_VERSION.to_string(),
            platform: std::env::consts::OS.to_string(),
            mode: DEFAULT_CLIENT_MODE.to_string(),
            role: DEFAULT_ROLE.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            locale: None,
            user_agent: Some(USER_AGENT.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub min_protocol: u32,
    pub max_protocol: u32,
    pub client: ClientInfo,
    pub role: String,
    pub scopes: Vec<String>,
    pub caps: Vec<String>,
    pub commands: Vec<String>,
    pub permissions: BTreeMap<String, bool>,
    pub auth: ConnectAuth,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Echo of the `connect.challenge` nonce, when one arrived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub id: String,
    pub version: String,
    pub platform: String,
    pub mode: String,
}

/// Carries the token in clear text because it goes on the wire. Debug
/// output redacts it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectAuth {
    pub token: String,
}

impl fmt::Debug for ConnectAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectAuth")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl ConnectParams {
    pub fn new(identity: &ClientIdentity, token: &RedactedToken, nonce: Option<&str>) -> Self {
        Self {
            min_protocol: PROTOCOL_VERSION,
            max_protocol: PROTOCOL_VERSION,
            client: ClientInfo {
                id: identity.client_id.clone(),
                version: identity.client_version.clone(),
                platform: identity.platform.clone(),
                mode: identity.mode.clone(),
            },
            role: identity.role.clone(),
            scopes: identity.scopes.clone(),
            caps: Vec::new(),
            commands: Vec::new(),
            permissions: BTreeMap::new(),
            auth: ConnectAuth {
                token: token.expose().to_string(),
            },
            locale: identity.locale.clone(),
            user_agent: identity.user_agent.clone(),
            nonce: nonce.map(str::to_string),
        }
    }
}
