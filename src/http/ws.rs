//! WebSocket binding: one JSON-RPC message per text frame, each direction

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::mcp::rpc::{self, encode, Response as RpcResponse};
use crate::mcp::server::{initialize_result, TransportKind};
use crate::mcp::session::{ConnectionLifecycle, ConnectionState, OutboundEvent};
use crate::AppState;

const TRANSPORT: TransportKind = TransportKind::WebSocket;
pub const GREETING_ID: &str = "init";

/// `GET /ws`
pub async fn websocket(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| serve_socket(state, socket))
}

async fn serve_socket(state: AppState, socket: WebSocket) {
    let client_id = Uuid::new_v4().to_string();
    let sessions = state.websockets.clone();
    let mut lifecycle = ConnectionLifecycle::new(sessions.label(), client_id.clone());
    let (guard, mut events) = sessions.register(client_id.clone());
    lifecycle.advance(ConnectionState::Open);
    info!(client_id = %client_id, "websocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Err(err) = sender.send(Message::Text(event.data.into())).await {
                debug!(error = %err, "websocket write failed");
                break;
            }
        }
    });

    let greeting = RpcResponse::result(Some(GREETING_ID.to_string()), initialize_result(TRANSPORT));
    let reply = |response: &RpcResponse| {
        sessions.send(&client_id, OutboundEvent::new("message", encode(response)))
    };

    if reply(&greeting).is_ok() {
        while let Some(frame) = receiver.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Binary(_)) => {
                    debug!(client_id = %client_id, "ignoring binary frame");
                    continue;
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(err) => {
                    warn!(client_id = %client_id, error = %err, "websocket read failed");
                    break;
                }
            };

            let response = match rpc::decode_str(text.as_str()) {
                Ok(request) => state.dispatcher.handle(TRANSPORT, request).await,
                Err(err) => {
                    warn!(client_id = %client_id, error = %err, "undecodable websocket message");
                    RpcResponse::parse_failure(&err)
                }
            };

            if reply(&response).is_err() {
                break;
            }
        }
    }

    lifecycle.advance(ConnectionState::Closing);
    drop(guard);
    if let Err(err) = writer.await {
        debug!(error = %err, "websocket writer task ended abnormally");
    }
    info!(client_id = %client_id, "websocket connection closed");
}
