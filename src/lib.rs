use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::debug;

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod tool_registry;
pub mod transport;

use auth::CredentialStore;
use config::Config;
use mcp::dedup::DedupCache;
use mcp::rpc::Response;
use mcp::server::Dispatcher;
use mcp::session::SessionRegistry;
use tool_registry::ToolRegistry;

pub const SHUTDOWN_ID: &str = "shutdown";

/// Shared state of the axum listener (streamable HTTP and WebSocket bindings).
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub streams: SessionRegistry,
    pub websockets: SessionRegistry,
    pub dedup: DedupCache,
    pub credentials: CredentialStore,
    pub chunk_delay: Duration,
}

impl AppState {
    pub fn new(tools: Arc<dyn ToolRegistry>, config: &Config) -> Self {
        Self {
            dispatcher: Dispatcher::new(tools),
            streams: SessionRegistry::new("streamable_http"),
            websockets: SessionRegistry::new("websocket"),
            dedup: DedupCache::new(config.dedup_ttl),
            credentials: CredentialStore::new(),
            chunk_delay: config.chunk_delay,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let streamable = Router::new()
        .route("/", post(http::handlers::rpc_endpoint))
        .route(
            "/initialize",
            post(http::handlers::initialize).options(http::handlers::initialize_preflight),
        )
        .route("/tools/list", post(http::handlers::tools_list))
        .route("/tools/call", post(http::handlers::tools_call))
        .route("/stream/{client_id}", get(http::handlers::open_stream))
        .route(
            "/stream/{client_id}/message",
            post(http::handlers::stream_message),
        )
        .route("/health", get(http::handlers::health));

    Router::new()
        .nest("/mcp/v1", streamable)
        .route("/ws", get(http::ws::websocket))
        .layer(middleware::from_fn(http::handlers::allow_any_origin))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}

/// Sent to every live session when the process is stopping.
pub fn shutdown_notice() -> Response {
    Response::result(
        Some(SHUTDOWN_ID.to_string()),
        json!({ "status": "shutting_down" }),
    )
}

/// Best-effort broadcast of [`shutdown_notice`]; returns the number of sessions reached.
pub fn broadcast_shutdown(registries: &[&SessionRegistry]) -> usize {
    let notice = shutdown_notice();
    registries
        .iter()
        .map(|registry| {
            debug!(
                transport = registry.label(),
                clients = ?registry.client_ids(),
                "notifying sessions of shutdown"
            );
            registry.broadcast(&notice)
        })
        .sum()
}
