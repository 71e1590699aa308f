//! The central Model Context Protocol engine
//!
//! Routes decoded requests to the built-in methods (`initialize`, `ping`,
//! `tools/list`, `tools/call`, `notifications/initialized`) and the tool
//! registry. Every transport binding shares one [`Dispatcher`]; nothing raised
//! while handling a request escapes as anything other than a [`Response`].

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures_util::FutureExt;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::mcp::rpc::{Request, Response, INTERNAL_ERROR, METHOD_NOT_FOUND, PROTOCOL_VERSION};
use crate::tool_registry::{ToolDescriptor, ToolError, ToolRegistry};

pub const SERVER_NAME: &str = "Insurance Campaign MCP Server";

/// Authentication schemes advertised in `initialize`; none are enforced.
pub const AUTH_SCHEMES: [&str; 4] = ["oauth", "bearer", "api_key", "custom"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Socket,
    StreamableHttp,
    WebSocket,
    Stdio,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Socket => "socket",
            Self::StreamableHttp => "streamable_http",
            Self::WebSocket => "websocket",
            Self::Stdio => "stdio",
        }
    }

    /// Only the streamable binding delivers chunked tool results.
    pub fn supports_streaming(self) -> bool {
        matches!(self, Self::StreamableHttp)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    tools: Arc<dyn ToolRegistry>,
}

impl Dispatcher {
    pub fn new(tools: Arc<dyn ToolRegistry>) -> Self {
        Self { tools }
    }

    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools.list_tools()
    }

    /// Runs a tool, converting a panic inside the handler into [`ToolError::Execution`].
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let tools = Arc::clone(&self.tools);
        AssertUnwindSafe(async move { tools.call_tool(name, arguments) })
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                warn!(tool = name, "tool handler panicked");
                Err(ToolError::Execution(format!("tool {name} panicked")))
            })
    }

    pub async fn handle(&self, transport: TransportKind, request: Request) -> Response {
        let audit_params = redact_audit_value(&Value::Object(request.params.clone()));
        let id = request.id.clone();

        let response = match request.method.as_str() {
            "initialize" => Response::result(id, initialize_result(transport)),
            "ping" => Response::result(id, json!({ "pong": Utc::now().timestamp_millis() })),
            "tools/list" => Response::result(id, json!({ "tools": self.list_tools() })),
            "tools/call" => self.handle_tools_call(id, &request).await,
            "notifications/initialized" => Response::result(id, json!({})),
            other => Response::error(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
        };

        info!(
            transport = %transport,
            method = %request.method,
            params = %audit_params,
            outcome = if response.is_error() { "failure" } else { "success" },
            "mcp action audited"
        );

        response
    }

    async fn handle_tools_call(&self, id: Option<String>, request: &Request) -> Response {
        let name = request.tool_name().unwrap_or_default();
        let arguments = request.tool_arguments();

        match self.call_tool(name, &arguments).await {
            Ok(content) => Response::result(id, json!({ "content": content })),
            Err(err) => tool_error_response(id, &err),
        }
    }
}

/// Unknown tools and failing tools share `-32603`.
pub fn tool_error_response(id: Option<String>, err: &ToolError) -> Response {
    Response::error(id, INTERNAL_ERROR, format!("Tool execution error: {err}"))
}

pub fn initialize_result(transport: TransportKind) -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {},
            "streaming": transport.supports_streaming(),
            "authentication": {
                "supported": AUTH_SCHEMES,
                "required": false,
            },
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "transport": transport.as_str(),
        },
    })
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "api_key" | "apikey" | "x-api-key"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
        || normalized.contains("credential")
}
