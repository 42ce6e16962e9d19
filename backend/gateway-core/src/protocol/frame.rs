//! Frame codec.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One discrete protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    #[serde(rename = "req")]
    Request(GatewayRequest),

    #[serde(rename = "res")]
    Response(GatewayResponse),

    #[serde(rename = "event")]
    Event(GatewayEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseError {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(
        rename = "stateVersion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub state_version: Option<u64>,
}

impl Frame {
    /// Parse one inbound text message.
    ///
    /// Anything that is not a well-formed frame yields `None`; the caller drops it.
    pub fn decode(text: &str) -> Option<Frame> {
        match serde_json::from_str(text) {
            Ok(frame) => Some(frame),
            Err(e) => {
                debug!("Dropping malformed frame ({} bytes): {e}", text.len());
                None
            }
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn request(id: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        Frame::Request(GatewayRequest {
            id: id.into(),
            method: method.into(),
            params,
        })
    }
}

impl GatewayEvent {
    /// String field of the payload object, if present.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.as_ref()?.get(key)?.as_str()
    }
}
