//! Streamable HTTP binding
//!
//! Stateless POST endpoints for `initialize`, `tools/list` and `tools/call`, a
//! long-lived SSE stream per client id, and a stream-message endpoint that runs
//! a tool in the background and reports progress as SSE events.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures_util::Stream;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{generate_client_id, CallerCredentials, CredentialStore};
use crate::domain::utils::now_millis;
use crate::errors::AppError;
use crate::mcp::dedup::DedupKey;
use crate::mcp::rpc::{self, Request as RpcRequest, Response as RpcResponse, PROTOCOL_VERSION};
use crate::mcp::server::{Dispatcher, TransportKind};
use crate::mcp::session::{
    ConnectionLifecycle, ConnectionState, EventSink, OutboundEvent, SessionGuard,
};
use crate::mcp::stream::chunk_result;
use crate::AppState;

const TRANSPORT: TransportKind = TransportKind::StreamableHttp;
const PREFLIGHT_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const PREFLIGHT_HEADERS: &str =
    "Content-Type, Authorization, X-API-Key, X-Client-ID, x-custom-auth-headers";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub protocol: String,
    pub timestamp: i64,
    pub active_streams: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP",
        service: "MCP Streamable HTTP Transport",
        version: env!("CARGO_PKG_VERSION"),
        protocol: format!("MCP {PROTOCOL_VERSION}"),
        timestamp: now_millis(),
        active_streams: state.streams.count(),
    })
}

/// `POST /mcp/v1/initialize`. Retries inside the dedup window get a canned
/// response and skip recording credentials.
pub async fn initialize(
    State(state): State<AppState>,
    credentials: CallerCredentials,
    body: Bytes,
) -> Result<Response, AppError> {
    let request = rpc::decode_for(&body, "initialize")?;

    let client_id = generate_client_id();
    let key = DedupKey::new(
        request.id.clone().unwrap_or_default(),
        request.method.clone(),
        credentials.caller_hash(),
    );

    if state.dedup.is_duplicate(key) {
        warn!(
            request_id = request.id.as_deref().unwrap_or_default(),
            client_id = %client_id,
            "duplicate initialize request answered from cache"
        );
        let response = state.dispatcher.handle(TRANSPORT, request).await;
        let response = with_result_fields(
            response,
            [("clientId", json!(client_id)), ("cached", json!(true))],
        );
        return Ok(Json(response).into_response());
    }

    info!(
        client_id = %client_id,
        request_id = request.id.as_deref().unwrap_or_default(),
        scheme = ?credentials.scheme,
        "initialize request"
    );

    if !credentials.is_anonymous() {
        state.credentials.record(&client_id, credentials);
    }

    let request_id = request
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let response = state.dispatcher.handle(TRANSPORT, request).await;
    let response = with_result_fields(response, [("clientId", json!(client_id))]);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=300"),
    );
    insert_header(&mut headers, HeaderName::from_static("x-request-id"), &request_id);
    insert_header(&mut headers, HeaderName::from_static("x-client-id"), &client_id);

    Ok((headers, Json(response)).into_response())
}

/// `OPTIONS /mcp/v1/initialize`
pub async fn initialize_preflight(request_headers: HeaderMap) -> Response {
    let origin = request_headers
        .get(header::ORIGIN)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"));

    let mut headers = HeaderMap::new();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(PREFLIGHT_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(PREFLIGHT_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("7200"));

    (StatusCode::OK, headers).into_response()
}

/// `POST /mcp/v1/tools/list`
pub async fn tools_list(
    State(state): State<AppState>,
    credentials: CallerCredentials,
    body: Bytes,
) -> Result<Json<RpcResponse>, AppError> {
    let request = rpc::decode_for(&body, "tools/list")?;
    let client_id = credentials.client_id_or_generate();

    let response = state.dispatcher.handle(TRANSPORT, request).await;
    Ok(Json(with_result_fields(
        response,
        [("streaming", json!(true)), ("clientId", json!(client_id))],
    )))
}

/// `POST /mcp/v1/tools/call`. With `stream: true` only an acknowledgement is
/// returned; the call itself goes through the stream-message endpoint.
pub async fn tools_call(
    State(state): State<AppState>,
    credentials: CallerCredentials,
    body: Bytes,
) -> Result<Json<RpcResponse>, AppError> {
    let request = rpc::decode_for(&body, "tools/call")?;
    let client_id = credentials.client_id_or_generate();

    info!(
        tool = request.tool_name().unwrap_or_default(),
        client_id = %client_id,
        streaming = request.wants_stream(),
        "tool call requested"
    );

    if request.wants_stream() {
        return Ok(Json(RpcResponse::result(
            request.id,
            json!({
                "streaming": true,
                "streamId": client_id,
                "message": "Tool execution started, check stream for results",
                "clientId": client_id,
            }),
        )));
    }

    let mut response = state.dispatcher.handle(TRANSPORT, request).await;
    if let Some(result) = response.result.take() {
        let content = result.get("content").cloned().unwrap_or(Value::Null);
        response.result = Some(json!({
            "content": [{
                "type": "text",
                "text": content.to_string(),
                "index": 0,
            }],
            "clientId": client_id,
        }));
    }

    Ok(Json(response))
}

/// `POST /mcp/v1`: any method through the shared dispatcher.
pub async fn rpc_endpoint(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RpcResponse>, AppError> {
    let request = rpc::decode(&body)?;
    Ok(Json(state.dispatcher.handle(TRANSPORT, request).await))
}

/// Keeps the SSE session registered until the response body is dropped.
struct StreamLease {
    guard: SessionGuard,
    credentials: CredentialStore,
    lifecycle: ConnectionLifecycle,
}

impl Drop for StreamLease {
    fn drop(&mut self) {
        self.lifecycle.advance(ConnectionState::Closing);
        let client_id = self.guard.client_id();
        if self.guard.is_superseded() {
            debug!(client_id, "stream replaced, keeping caller credentials");
        } else if self.credentials.remove(client_id) {
            debug!(client_id, "caller credentials dropped");
        }
        info!(client_id, "sse stream closed");
    }
}

/// `GET /mcp/v1/stream/{client_id}`
pub async fn open_stream(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut lifecycle = ConnectionLifecycle::new(state.streams.label(), client_id.clone());
    let (guard, events) = state.streams.register(client_id.clone());

    let connected = json!({
        "clientId": client_id,
        "status": "connected",
        "timestamp": now_millis(),
    });
    if let Err(err) = state
        .streams
        .send(&client_id, OutboundEvent::new("connected", connected.to_string()))
    {
        warn!(client_id = %client_id, error = %err, "failed to queue connected event");
    }
    lifecycle.advance(ConnectionState::Open);
    info!(client_id = %client_id, "sse stream opened");

    let lease = StreamLease {
        guard,
        credentials: state.credentials.clone(),
        lifecycle,
    };
    let stream = UnboundedReceiverStream::new(events).map(move |event| {
        let _lease = &lease;
        Ok(Event::default().event(event.name).data(event.data))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// `POST /mcp/v1/stream/{client_id}/message`
pub async fn stream_message(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let request = rpc::decode_for(&body, "tools/call")?;
    let sink = state.streams.lookup(&client_id)?;

    tokio::spawn(run_streamed_call(
        state.dispatcher.clone(),
        sink,
        client_id.clone(),
        request,
        state.chunk_delay,
    ));

    Ok(Json(json!({ "status": "message_sent", "clientId": client_id })))
}

/// Emits `tool_start`, one `chunk` per streamed section, then `tool_complete`.
/// Stops early once the client's stream is gone.
pub async fn run_streamed_call(
    dispatcher: Dispatcher,
    sink: EventSink,
    client_id: String,
    request: RpcRequest,
    chunk_delay: Duration,
) {
    let tool = request.tool_name().unwrap_or_default().to_string();
    let arguments: Map<String, Value> = request.tool_arguments();
    info!(tool = %tool, client_id = %client_id, "processing stream message");

    let emit = |name: &str, data: Value| -> bool {
        let delivered = sink.send(OutboundEvent::new(name, data.to_string())).is_ok();
        if !delivered {
            debug!(client_id = %client_id, event = name, "stream closed, discarding event");
        }
        delivered
    };

    let started = json!({ "tool": tool, "clientId": client_id, "timestamp": now_millis() });
    if !emit("tool_start", started) {
        return;
    }

    let result = match dispatcher.call_tool(&tool, &arguments).await {
        Ok(result) => result,
        Err(err) => {
            warn!(tool = %tool, client_id = %client_id, error = %err, "streamed tool call failed");
            emit(
                "error",
                json!({ "error": err.to_string(), "clientId": client_id, "timestamp": now_millis() }),
            );
            return;
        }
    };

    for chunk in chunk_result(&result) {
        let is_last = chunk.is_last;
        let data = json!({
            "index": chunk.index,
            "total": chunk.total,
            "isLast": chunk.is_last,
            "content": chunk.content,
            "clientId": client_id,
        });
        if !emit("chunk", data) {
            return;
        }
        if !is_last && !chunk_delay.is_zero() {
            tokio::time::sleep(chunk_delay).await;
        }
    }

    emit(
        "tool_complete",
        json!({
            "tool": tool,
            "result": result,
            "clientId": client_id,
            "timestamp": now_millis(),
        }),
    );
}

/// Adds `Access-Control-Allow-Origin: *` unless the handler already chose an origin.
pub async fn allow_any_origin(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .entry(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .or_insert(HeaderValue::from_static("*"));
    response
}

fn with_result_fields<const N: usize>(
    mut response: RpcResponse,
    fields: [(&str, Value); N],
) -> RpcResponse {
    if let Some(Value::Object(result)) = response.result.as_mut() {
        for (key, value) in fields {
            result.insert(key.to_string(), value);
        }
    }
    response
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => warn!(header = %name, "skipping header with invalid value"),
    }
}
