//! JSON-RPC envelope types and the transport-agnostic codec
//!
//! Every binding decodes its payload into a [`Request`] with [`decode`] and writes
//! a [`Response`] back with [`encode`]. Framing (HTTP headers, SSE fields, lines)
//! is stripped or added by the binding itself.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INTERNAL_ERROR: i32 = -32603;

/// Id echoed when the originating request id could not be recovered.
pub const ERROR_ID: &str = "error";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed request: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(
        default,
        deserialize_with = "opaque_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub method: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Exactly one of `result`/`error` is populated. `result` is always written
/// (as `null` on failure); `error` is omitted on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Request {
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id: Some(id.into()),
            method: method.into(),
            params: match params {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            stream: None,
        }
    }

    /// `stream` may be sent at the envelope level or inside `params`.
    pub fn wants_stream(&self) -> bool {
        self.stream
            .or_else(|| self.params.get("stream").and_then(Value::as_bool))
            .unwrap_or(false)
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.params.get("name").and_then(Value::as_str)
    }

    pub fn tool_arguments(&self) -> Map<String, Value> {
        match self.params.get("arguments") {
            Some(Value::Object(arguments)) => arguments.clone(),
            _ => Map::new(),
        }
    }
}

impl Response {
    pub fn result(id: Option<String>, result: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<String>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Response for a payload whose id could not be decoded.
    pub fn parse_failure(err: &ParseError) -> Self {
        Self::error(
            Some(ERROR_ID.to_string()),
            INTERNAL_ERROR,
            format!("Internal error: {err}"),
        )
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

pub fn decode(bytes: &[u8]) -> Result<Request, ParseError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decodes a body whose method is implied by the endpoint it was posted to.
/// Any `method` in the body is replaced by `method`.
pub fn decode_for(bytes: &[u8], method: &str) -> Result<Request, ParseError> {
    let mut envelope: Value = serde_json::from_slice(bytes)?;
    if let Value::Object(fields) = &mut envelope {
        fields.insert("method".to_string(), Value::String(method.to_string()));
    }
    Ok(serde_json::from_value(envelope)?)
}

pub fn decode_str(text: &str) -> Result<Request, ParseError> {
    decode(text.as_bytes())
}

pub fn encode(response: &Response) -> String {
    serde_json::to_string(response).unwrap_or_else(|err| {
        json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": response.id,
            "result": null,
            "error": {
                "code": INTERNAL_ERROR,
                "message": format!("Internal error: {err}"),
            },
        })
        .to_string()
    })
}

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

/// Ids are opaque strings; numeric ids are accepted and kept in their textual form.
fn opaque_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(id),
        Some(other) => Some(other.to_string()),
    })
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}
