//! Gateway configuration document (`config.*`).
//!
//! Writes are optimistic: each carries the `baseHash` of the snapshot it was
//! derived from, and the gateway refuses it if the document changed since.

use crate::api::{CONFIG_RESTART_DELAY_MS, call, call_typed};
use crate::error::api::ApiError;
use crate::protocol::methods;
use crate::session::GatewaySession;

use std::sync::OnceLock;

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const LINE_COMMENT_PATTERN: &str = r"(?m)//.*$";
const BLOCK_COMMENT_PATTERN: &str = r"(?s)/\*.*?\*/";
const TRAILING_COMMA_PATTERN: &str = r",(\s*[}\]])";

static LINE_COMMENT: OnceLock<Regex> = OnceLock::new();
static BLOCK_COMMENT: OnceLock<Regex> = OnceLock::new();
static TRAILING_COMMA: OnceLock<Regex> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex pattern"))
}

/// Result of `config.get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Document text exactly as stored by the gateway.
    pub raw: String,
    /// Version tag to pass back as `baseHash`.
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed: Option<Value>,
}

impl ConfigSnapshot {
    /// Structured view of the document.
    ///
    /// Uses `parsed` when the gateway sent it, otherwise parses `raw`. Documents
    /// with comments or trailing commas are retried after stripping them.
    pub fn parsed_or_lenient(&self) -> Option<Value> {
        if let Some(parsed) = &self.parsed {
            return Some(parsed.clone());
        }
        parse_lenient(&self.raw)
    }
}

/// Parse JSON, tolerating `//` and `/* */` comments and trailing commas.
pub fn parse_lenient(raw: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(raw) {
        return Some(value);
    }

    let cleaned = strip_json_extensions(raw);
    match serde_json::from_str(&cleaned) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Config document is not parseable even after cleanup: {e}");
            None
        }
    }
}

fn strip_json_extensions(raw: &str) -> String {
    let cleaned = compiled(&LINE_COMMENT, LINE_COMMENT_PATTERN).replace_all(raw, "");
    let cleaned = compiled(&BLOCK_COMMENT, BLOCK_COMMENT_PATTERN).replace_all(&cleaned, "");
    compiled(&TRAILING_COMMA, TRAILING_COMMA_PATTERN)
        .replace_all(&cleaned, "$1")
        .into_owned()
}

#[derive(Clone)]
pub struct ConfigClient {
    session: GatewaySession,
}

impl ConfigClient {
    pub fn new(session: GatewaySession) -> Self {
        Self { session }
    }

    pub async fn get(&self) -> Result<ConfigSnapshot, ApiError> {
        call_typed(
            &self.session,
            methods::CONFIG_GET,
            json!({}),
            "Failed to get config",
        )
        .await
    }

    /// Merge `raw` into the document, then restart the gateway.
    pub async fn patch(&self, raw: &str, base_hash: &str) -> Result<(), ApiError> {
        self.write(
            methods::CONFIG_PATCH,
            json!({ "raw": raw, "baseHash": base_hash, "restartDelayMs": CONFIG_RESTART_DELAY_MS }),
            "Failed to patch config",
        )
        .await
    }

    /// Replace the document without restarting.
    pub async fn set(&self, raw: &str, base_hash: &str) -> Result<(), ApiError> {
        self.write(
            methods::CONFIG_SET,
            json!({ "raw": raw, "baseHash": base_hash }),
            "Failed to set config",
        )
        .await
    }

    /// Replace the document, then restart the gateway.
    pub async fn apply(&self, raw: &str, base_hash: &str) -> Result<(), ApiError> {
        self.write(
            methods::CONFIG_APPLY,
            json!({ "raw": raw, "baseHash": base_hash, "restartDelayMs": CONFIG_RESTART_DELAY_MS }),
            "Failed to apply config",
        )
        .await
    }

    async fn write(&self, method: &str, params: Value, default_message: &str) -> Result<(), ApiError> {
        call(&self.session, method, params, default_message).await?;
        Ok(())
    }
}
