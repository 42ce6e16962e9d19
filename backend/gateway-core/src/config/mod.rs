use crate::error::config::ConfigError;
use crate::protocol::ClientIdentity;
use crate::protocol::handshake::{
    CLIENT_VERSION, DEFAULT_CLIENT_ID, DEFAULT_CLIENT_MODE, DEFAULT_ROLE, DEFAULT_SCOPES,
};
use crate::session::timer::millis;
use crate::session::{HANDSHAKE_FALLBACK_DELAY, RECONNECT_DELAY, REQUEST_TIMEOUT, SessionConfig};

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_VERSION: u32 = 1;

// ============================================
// CONFIG STRUCTS
// ============================================

/// Where the gateway lives. The token is never stored here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEndpointConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_handshake_fallback_ms")]
    pub handshake_fallback_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            handshake_fallback_ms: default_handshake_fallback_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_client_version")]
    pub client_version: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    pub locale: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            client_version: default_client_version(),
            mode: default_mode(),
            role: default_role(),
            scopes: default_scopes(),
            locale: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewayEndpointConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub identity: IdentityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            gateway: GatewayEndpointConfig::default(),
            timing: TimingConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_handshake_fallback_ms() -> u64 {
    millis(HANDSHAKE_FALLBACK_DELAY)
}
fn default_request_timeout_ms() -> u64 {
    millis(REQUEST_TIMEOUT)
}
fn default_reconnect_delay_ms() -> u64 {
    millis(RECONNECT_DELAY)
}
fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}
fn default_client_version() -> String {
    CLIENT_VERSION.to_string()
}
fn default_mode() -> String {
    DEFAULT_CLIENT_MODE.to_string()
}
fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}
fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|scope| scope.to_string()).collect()
}

// ============================================
// IMPLEMENTATION
// ============================================

impl ClientConfig {
    /// Load config from {config_dir}/config.json.
    ///
    /// # Returns
    ///
    /// Returns `Ok(ClientConfig)` if loaded successfully or defaults if the file is missing.
    /// Returns `Err(ConfigError)` if the file exists but is unreadable or invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {e}");
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: ClientConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {e}");
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/config.json using atomic write.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - Validation fails
    /// - Directory creation fails
    /// - Serialization fails
    /// - Write or rename fails
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{CONFIG_FILE_NAME}.tmp"));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(validation_error(format!(
                "Invalid version: {} (expected 1-{CONFIG_VERSION})",
                self.version
            )));
        }

        let timings = [
            ("handshake_fallback_ms", self.timing.handshake_fallback_ms),
            ("request_timeout_ms", self.timing.request_timeout_ms),
            ("reconnect_delay_ms", self.timing.reconnect_delay_ms),
        ];
        if let Some((name, _)) = timings.iter().find(|(_, value)| *value == 0) {
            return Err(validation_error(format!("timing.{name} must be greater than 0")));
        }

        if self.identity.client_id.trim().is_empty() {
            return Err(validation_error("identity.client_id cannot be empty"));
        }
        if self.identity.role.trim().is_empty() {
            return Err(validation_error("identity.role cannot be empty"));
        }

        if let Some(url) = &self.gateway.url {
            if url.trim().is_empty() {
                return Err(validation_error("gateway.url cannot be empty string"));
            }
        }

        Ok(())
    }
}

#[track_caller]
fn validation_error(reason: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        location: ErrorLocation::from(Location::caller()),
        reason: reason.into(),
    }
}

impl From<&IdentityConfig> for ClientIdentity {
    fn from(identity: &IdentityConfig) -> Self {
        Self {
            client_id: identity.client_id.clone(),
            client_version: identity.client_version.clone(),
            mode: identity.mode.clone(),
            role: identity.role.clone(),
            scopes: identity.scopes.clone(),
            locale: identity.locale.clone(),
            ..ClientIdentity::default()
        }
    }
}

impl From<&ClientConfig> for SessionConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            identity: ClientIdentity::from(&config.identity),
            handshake_fallback: Duration::from_millis(config.timing.handshake_fallback_ms),
            request_timeout: Duration::from_millis(config.timing.request_timeout_ms),
            reconnect_delay: Duration::from_millis(config.timing.reconnect_delay_ms),
        }
    }
}
