//! Model Context Protocol (MCP) core shared by every transport binding
//!
//! Provides the JSON-RPC codec, method dispatch, session registries, request
//! de-duplication and chunk framing for streamed tool results.

pub mod dedup;
pub mod rpc;
pub mod server;
pub mod session;
pub mod stream;
