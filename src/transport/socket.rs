//! Raw-socket binding
//!
//! Each accepted TCP connection is answered with a hand-written HTTP/1.1 header
//! block and then treated as an SSE stream. Requests arrive on the same
//! connection as `Content-Length` delimited bodies after a header block; any
//! number of requests may be pipelined. Responses are written as
//! `event: mcp-response` frames in the order requests were decoded. Oversized
//! header lines or bodies get a final `mcp-error` and the connection is closed.

use std::io;
use std::net::SocketAddr;

use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::mcp::rpc::{self, encode, Response, ERROR_ID, INTERNAL_ERROR, PROTOCOL_VERSION};
use crate::mcp::server::{Dispatcher, TransportKind};
use crate::mcp::session::{ConnectionLifecycle, ConnectionState, OutboundEvent, SessionRegistry};

const TRANSPORT: TransportKind = TransportKind::Socket;

pub const RESPONSE_HEAD: &str = "HTTP/1.1 200 OK\r\n\
Content-Type: text/event-stream\r\n\
Cache-Control: no-cache\r\n\
Connection: keep-alive\r\n\
Access-Control-Allow-Origin: *\r\n\
Access-Control-Allow-Headers: Cache-Control\r\n\
\r\n";

/// Largest request body accepted on one connection.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;
/// Longest header line, terminator included.
pub const MAX_HEADER_LINE_BYTES: usize = 8 * 1024;

pub const CONNECTION_EVENT: &str = "connection";
pub const RESPONSE_EVENT: &str = "mcp-response";
pub const ERROR_EVENT: &str = "mcp-error";

/// Header-block state for one connection.
///
/// Lines are fed until the blank line ending a header block; the declared
/// `Content-Length` (case-insensitive, malformed values count as 0) is then the
/// number of body bytes to read before the next header block starts.
#[derive(Debug, Default)]
pub struct RequestFramer {
    content_length: usize,
}

impl RequestFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the body length once `line` ends the header block.
    pub fn feed_line(&mut self, line: &str) -> Option<usize> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Some(std::mem::take(&mut self.content_length));
        }

        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                self.content_length = value.trim().parse().unwrap_or(0);
            }
        }
        None
    }
}

pub fn format_event(event: &OutboundEvent) -> String {
    format!("event: {}\ndata: {}\n\n", event.name, event.data)
}

/// Accepts connections until the listener fails; each connection runs on its own task.
pub async fn serve_socket(
    listener: TcpListener,
    dispatcher: Dispatcher,
    sessions: SessionRegistry,
) -> io::Result<()> {
    info!(addr = %listener.local_addr()?, "raw socket transport listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(error = %err, "failed to accept socket connection");
                continue;
            }
        };

        let dispatcher = dispatcher.clone();
        let sessions = sessions.clone();
        tokio::spawn(async move {
            handle_connection(stream, peer, dispatcher, sessions).await;
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Dispatcher,
    sessions: SessionRegistry,
) {
    let client_id = Uuid::new_v4().to_string();
    let mut lifecycle = ConnectionLifecycle::new(sessions.label(), client_id.clone());
    let (read_half, mut write_half) = stream.into_split();

    if let Err(err) = write_half.write_all(RESPONSE_HEAD.as_bytes()).await {
        warn!(peer = %peer, error = %err, "failed to write response head");
        return;
    }

    let (guard, mut events) = sessions.register(client_id.clone());
    lifecycle.advance(ConnectionState::Open);
    info!(peer = %peer, client_id = %client_id, "socket connection established");

    let writer_client = client_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let frame = format_event(&event);
            let written = match write_half.write_all(frame.as_bytes()).await {
                Ok(()) => write_half.flush().await,
                Err(err) => Err(err),
            };
            if let Err(err) = written {
                debug!(client_id = %writer_client, error = %err, "socket write failed");
                break;
            }
            debug!(client_id = %writer_client, event = %event.name, "sent event");
        }
    });

    let connected = json!({
        "status": "connected",
        "clientId": client_id,
        "protocolVersion": PROTOCOL_VERSION,
    });
    let mut open = sessions
        .send(&client_id, OutboundEvent::new(CONNECTION_EVENT, connected.to_string()))
        .is_ok();

    let mut reader = BufReader::new(read_half);
    let mut framer = RequestFramer::new();
    let mut line = String::new();

    while open {
        line.clear();
        let limit = MAX_HEADER_LINE_BYTES as u64;
        match (&mut reader).take(limit).read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(client_id = %client_id, error = %err, "socket read failed");
                break;
            }
        }
        if line.len() >= MAX_HEADER_LINE_BYTES && !line.ends_with('\n') {
            warn!(client_id = %client_id, "header line too long, closing connection");
            reject(&sessions, &client_id, "header line too long");
            break;
        }

        let Some(length) = framer.feed_line(&line) else {
            continue;
        };
        if length == 0 {
            continue;
        }
        if length > MAX_BODY_BYTES {
            warn!(client_id = %client_id, length, "request body too large, closing connection");
            reject(
                &sessions,
                &client_id,
                &format!("request body of {length} bytes exceeds {MAX_BODY_BYTES}"),
            );
            break;
        }

        let mut body = Vec::new();
        match (&mut reader).take(length as u64).read_to_end(&mut body).await {
            Ok(read) if read == length => {}
            Ok(_) => {
                warn!(client_id = %client_id, "connection closed mid-body");
                break;
            }
            Err(err) => {
                warn!(client_id = %client_id, error = %err, "socket read failed mid-body");
                break;
            }
        }

        let event = match rpc::decode(&body) {
            Ok(request) => {
                let response = dispatcher.handle(TRANSPORT, request).await;
                OutboundEvent::new(RESPONSE_EVENT, encode(&response))
            }
            Err(err) => {
                error!(client_id = %client_id, error = %err, "error processing socket request");
                OutboundEvent::new(ERROR_EVENT, encode(&Response::parse_failure(&err)))
            }
        };
        open = sessions.send(&client_id, event).is_ok();
    }

    lifecycle.advance(ConnectionState::Closing);
    drop(guard);
    if let Err(err) = writer.await {
        debug!(error = %err, "socket writer task ended abnormally");
    }
    info!(client_id = %client_id, "socket connection closed");
}

/// Queues a final `mcp-error` before the connection is dropped.
fn reject(sessions: &SessionRegistry, client_id: &str, reason: &str) {
    let response = Response::error(
        Some(ERROR_ID.to_string()),
        INTERNAL_ERROR,
        format!("Internal error: {reason}"),
    );
    if let Err(err) = sessions.send(client_id, OutboundEvent::new(ERROR_EVENT, encode(&response))) {
        debug!(client_id, error = %err, "rejection not delivered");
    }
}
