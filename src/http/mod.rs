//! HTTP transports for the Model Context Protocol
//!
//! The streamable HTTP binding (`/mcp/v1/...`) and the WebSocket binding (`/ws`)
//! share one axum listener.

pub mod handlers;
pub mod ws;
